use anyhow::Result;
use comfy_table::{Cell, Table};
use ispmon::report::{format_span, ReportStore};
use ispmon::Config;

use crate::cli::{ReportCommand, ReportOptions, ReportShowOptions};

pub async fn execute_command(cfg: &Config, report_options: &ReportOptions) -> Result<()>
{
    match &report_options.command {
        ReportCommand::Show(show_options) => show(cfg, show_options).await?,
        ReportCommand::ClearQueue => clear_queue(cfg).await?,
    }
    Ok(())
}

async fn show(cfg: &Config, show_options: &ReportShowOptions) -> Result<()>
{
    let path = if show_options.queue { cfg.queue_path() } else { cfg.report_path() };
    let report = ReportStore::new(&cfg.report_title).load(&path).await;

    println!("{}", report.title);
    println!("    file   : {}", path.display());
    println!("    entries: {}", report.entries.len());
    println!("    span   : {}", format_span(report.span()));

    let skip = show_options.last
        .map(|n| report.entries.len().saturating_sub(n))
        .unwrap_or(0);

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(["TIME", "STATUS", "ID"]);

    for entry in report.entries.iter().skip(skip) {
        table.add_row([
            Cell::new(entry.time.format("%F %T %:z")),
            Cell::new(entry.status.as_str()),
            Cell::new(&entry.id),
        ]);
    }

    println!("{}", table);

    Ok(())
}

async fn clear_queue(cfg: &Config) -> Result<()>
{
    let path = cfg.queue_path();
    let store = ReportStore::new(&cfg.report_title);
    let discarded = store.load(&path).await.entries.len();
    store.clear(&path).await?;
    println!("cleared {} queued entries from {}", discarded, path.display());
    Ok(())
}
