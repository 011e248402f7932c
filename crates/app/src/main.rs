use anyhow::Context;
use clap::Parser;
use std::io::Write;

/// Prints pages of a text file of any size without loading it whole
#[derive(Parser, Debug)]
#[command(name = "llview")]
#[command(version)]
struct Args {
    /// File to view
    #[arg(value_name = "FILE")]
    file: std::path::PathBuf,

    /// Address to start at, decimal or 0x-prefixed hex
    #[arg(long, value_name = "ADDR", default_value = "0", value_parser = parse_address)]
    start: u64,

    /// Pages to print after the first one
    #[arg(long, value_name = "N", default_value_t = 0)]
    pages: u32,

    /// Page towards the start of the file instead of the end
    #[arg(long)]
    backward: bool,

    /// JSON file overriding the default viewer configuration
    #[arg(long, value_name = "JSON")]
    config: Option<std::path::PathBuf>,

    /// Do not trim pages to line boundaries
    #[arg(long)]
    no_pretty: bool,

    /// Decode with this encoding label instead of detecting it
    #[arg(long, value_name = "LABEL")]
    encoding: Option<String>,

    /// Log buffer and view activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_address(value: &str) -> Result<u64, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => value.parse(),
    };

    parsed.map_err(|e| format!("invalid address {value:?}: {e}"))
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_page(
    out: &mut impl Write,
    page: &viewer_state::view_cursor::DisplayResult,
) -> anyhow::Result<()> {
    out.write_all(page.text.as_bytes())?;

    if !page.text.ends_with('\n') {
        out.write_all(b"\n")?;
    }

    out.flush()?;

    eprintln!(
        "-- {} - {} cursor {} ({:?}{})",
        viewer_core::address::format_address(page.preferred_start_addr),
        viewer_core::address::format_address(page.preferred_end_addr),
        viewer_core::address::format_address(page.cursor_addr),
        page.direction,
        if page.stalled { ", stalled" } else { "" },
    );

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    let mut config = match &args.config {
        Some(path) => viewer_state::config::ViewerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => viewer_state::config::ViewerConfig::default(),
    };

    if args.no_pretty {
        config.pretty_trim = false;
    }

    if let Some(label) = args.encoding.clone() {
        config.encoding = Some(label);
    }

    let mut viewer = viewer_state::Viewer::open(&args.file, config, args.start)
        .with_context(|| format!("cannot view {}", args.file.display()))?;
    let mut stdout = std::io::stdout().lock();

    print_page(&mut stdout, viewer.cursor.current())?;

    for _ in 0..args.pages {
        let event = if args.backward {
            viewer.cursor.backward()
        } else {
            viewer.cursor.forward()
        };

        match event {
            Ok(viewer_state::view_cursor::ViewEvent::Redraw(page)) => {
                print_page(&mut stdout, &page)?;
            }
            Ok(viewer_state::view_cursor::ViewEvent::Unchanged) => {
                tracing::info!("no further pages");
                break;
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(error = %e, "page could not be read, stopping");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("500"), Ok(500));
        assert_eq!(parse_address("0x1F4"), Ok(500));
        assert_eq!(parse_address("0X00000001f4"), Ok(500));
        assert!(parse_address("-3").is_err());
        assert!(parse_address("0xZZ").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from([
            "llview", "big.log", "--start", "0x100", "--pages", "3", "--backward", "-v",
        ])
        .unwrap();

        assert_eq!(args.start, 256);
        assert_eq!(args.pages, 3);
        assert!(args.backward);
        assert!(args.verbose);
        assert!(!args.no_pretty);
        assert_eq!(args.encoding, None);

        let args = Args::try_parse_from(["llview", "big.log", "--encoding", "sjis"]).unwrap();

        assert_eq!(args.encoding.as_deref(), Some("sjis"));
    }

    #[test]
    fn test_print_page() {
        let page = viewer_state::view_cursor::DisplayResult {
            text: "no trailing newline".to_string(),
            ..Default::default()
        };
        let mut out = Vec::new();

        print_page(&mut out, &page).unwrap();

        assert_eq!(out, b"no trailing newline\n");
    }
}
