use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;


/// Layer that appends plain-text events to the file at `path`.
///
/// The parent directory must exist. Earlier content of the file is kept.
pub fn file_layer<S>(path: &Path) -> std::io::Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = open_append(path)?;
    Ok(tracing_subscriber::fmt::layer()
        .with_thread_ids(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file)))
}

fn open_append(path: &Path) -> std::io::Result<File>
{
    OpenOptions::new().create(true).append(true).open(path)
}
