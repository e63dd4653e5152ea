use blitzweek_core::registration::{self, RegistrationForm, Track};
use blitzweek_core::{Config, RegistrationStatus};
use clap::{Args, Subcommand};
use serde_json::json;

#[derive(Subcommand)]
pub enum RegisterAction {
    /// Check whether an LDAP id or roll number is already registered
    Check {
        /// LDAP e-mail or roll number
        identifier: String,
    },
    /// Validate and submit a registration
    Submit {
        #[command(flatten)]
        form: FormArgs,
        /// Validate and print the normalized payload without submitting
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Args)]
pub struct FormArgs {
    /// Full name
    #[arg(long)]
    name: String,
    /// IITB LDAP e-mail
    #[arg(long)]
    ldap_id: String,
    #[arg(long)]
    roll_number: String,
    #[arg(long)]
    branch: String,
    #[arg(long)]
    year: String,
    /// 10-digit mobile number
    #[arg(long)]
    phone: Option<String>,
    /// blitz, ignite or both
    #[arg(long, default_value = "blitz")]
    track: Track,
}

impl From<FormArgs> for RegistrationForm {
    fn from(args: FormArgs) -> Self {
        RegistrationForm {
            name: args.name,
            ldap_id: args.ldap_id,
            roll_number: args.roll_number,
            branch: args.branch,
            year: args.year,
            phone_number: args.phone,
            interested_events: args.track,
        }
    }
}

pub async fn run(action: RegisterAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();

    match action {
        RegisterAction::Check { identifier } => {
            let status = config.api_client()?.check_registration(&identifier).await?;
            let registered = status == RegistrationStatus::Registered;
            println!(
                "{}",
                json!({ "identifier": identifier, "registered": registered })
            );
        }
        RegisterAction::Submit { form, dry_run } => {
            let form = RegistrationForm::from(form);
            if dry_run {
                form.validate()?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "completion_pct": form.completion_pct(),
                        "payload": form.normalize(),
                    }))?
                );
                return Ok(());
            }
            let receipt = registration::submit(&config.api_client()?, &form).await?;
            println!(
                "{}",
                json!({
                    "registration_number": receipt.registration_number,
                    "track": form.interested_events.short(),
                })
            );
        }
    }
    Ok(())
}
