//! Business details commands.

use std::path::PathBuf;

use clap::Subcommand;
use console::style;

use jb_core::error::{JbError, JbResult};
use jb_models::models::attachment::encode_data_url;

use super::{or_dash, print_json, read_attachment};
use crate::{Context, OutputFormat};

#[derive(Subcommand)]
pub enum BusinessAction {
    /// Show the business details printed on invoices.
    Show,
    /// Change business details. Omitted options keep their value.
    Set {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Image to use as the logo.
        #[arg(long, conflicts_with = "clear_logo")]
        logo: Option<PathBuf>,
        /// Remove the logo.
        #[arg(long)]
        clear_logo: bool,
    },
}

pub async fn run(ctx: &Context, action: BusinessAction) -> JbResult<()> {
    let mut coordinator = super::open_coordinator(ctx)?;

    match action {
        BusinessAction::Show => {
            let info = &coordinator.state().business_info;
            match ctx.format {
                OutputFormat::Json => print_json(info)?,
                OutputFormat::Text => {
                    if info.is_empty() {
                        println!("No business details set. Use `jobbook business set --name ...`.");
                    } else {
                        println!("{}", style("Business").bold().underlined());
                        println!("  Name:     {}", or_dash(&info.name));
                        println!("  Address:  {}", or_dash(&info.address));
                        println!("  Phone:    {}", or_dash(&info.phone));
                        println!("  Email:    {}", or_dash(&info.email));
                        println!("  Logo:     {}", if info.logo.is_some() { "yes" } else { "-" });
                    }
                }
            }
        }
        BusinessAction::Set { name, address, phone, email, logo, clear_logo } => {
            let mut info = coordinator.state().business_info.clone();
            if let Some(name) = name {
                info.name = name;
            }
            if let Some(address) = address {
                info.address = address;
            }
            if let Some(phone) = phone {
                info.phone = phone;
            }
            if let Some(email) = email {
                info.email = email;
            }
            if clear_logo {
                info.logo = None;
            } else if let Some(path) = logo {
                let file = read_attachment(&path)?;
                if !file.meta.is_image() {
                    return Err(JbError::Validation(format!("{} is not an image", path.display())));
                }
                info.logo = Some(encode_data_url(&file.meta.mime_type, &file.payload));
            }

            coordinator.update_business_info(info).await?;
            println!("  {} Business details saved.", style("OK").green().bold());
        }
    }

    super::close(coordinator)
}
