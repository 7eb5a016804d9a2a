use anyhow::Result;
use ispmon::notify::{Mailer, Notification, SendGridMailer};
use ispmon::Config;

use crate::cli::{NotifyCommand, NotifyOptions};

pub async fn execute_command(cfg: &Config, notify_options: &NotifyOptions) -> Result<()>
{
    match &notify_options.command {
        NotifyCommand::Test => test(cfg).await?,
    }
    Ok(())
}

async fn test(cfg: &Config) -> Result<()>
{
    let mailer = SendGridMailer::from_config(cfg)?;
    let mut notification = Notification::from_config(cfg);
    notification.subject = format!("{} - Test", cfg.report_title);
    notification.plaintext = "This is a test message.".to_string();
    notification.html = notification.plaintext.clone();

    let response = mailer.send(&notification).await?;
    println!("test notification sent (status {})", response);
    Ok(())
}
