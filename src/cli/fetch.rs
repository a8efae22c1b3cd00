use std::path::PathBuf;

use clap::Args;
use tracing::{debug, info};

use crate::cli::layout::print_layout;
use crate::cli::OutputFormat;
use crate::client::api::ReadStoreClient;
use crate::client::config::ViewerConfig;
use crate::client::fetcher::{FetchEvent, RangeRequest, ReadFetcher};
use crate::client::notify::NotificationLevel;
use crate::core::api::ReadsetQuery;
use crate::core::region::Region;
use crate::core::types::{PaginationMode, QueryType, SoftClipDisplay};
use crate::viewport::jump::{fuzzy_find_sequence, JumpTarget};
use crate::viewport::scale::POINT_WIDTH;
use crate::viewport::session::ViewerSession;

#[derive(Args)]
pub struct FetchArgs {
    /// Base URL of the read store
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    pub url: String,

    /// Readset id to show; may be given several times
    #[arg(short, long = "readset", required = true)]
    pub readsets: Vec<String>,

    /// Region to fetch, e.g. chr1:10,000-10,200 (1-based, inclusive)
    #[arg(conflicts_with = "at")]
    pub region: Option<Region>,

    /// Jump target: a position (1,234,567) or a SNP id (rs7412)
    #[arg(long)]
    pub at: Option<String>,

    /// Sequence for a numeric --at, or to show at read level without --at
    #[arg(long)]
    pub sequence: Option<String>,

    /// Plot width in pixels, which decides how much of the sequence is visible
    #[arg(long, default_value = "1000")]
    pub width: f64,

    /// Viewer settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the configured pagination strategy
    #[arg(long, value_enum)]
    pub pagination: Option<PaginationMode>,

    /// Override the configured soft-clip display
    #[arg(long, value_enum)]
    pub soft_clips: Option<SoftClipDisplay>,

    /// Backend name passed to the read store
    #[arg(long)]
    pub backend: Option<String>,
}

pub fn run(args: FetchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move { run_fetch(args, format, verbose).await })
}

fn viewer_config(args: &FetchArgs) -> anyhow::Result<ViewerConfig> {
    let mut config = match &args.config {
        Some(path) => ViewerConfig::load_from_file(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(pagination) = args.pagination {
        config.pagination = pagination;
    }
    if let Some(soft_clips) = args.soft_clips {
        config.soft_clips = soft_clips;
    }
    // A one-shot fetch has nothing to debounce
    config.debounce_ms = 0;
    Ok(config)
}

async fn run_fetch(args: FetchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = viewer_config(&args)?;
    let mut client = ReadStoreClient::new(&args.url, config.request_timeout())?;
    if let Some(backend) = &args.backend {
        client = client.with_backend(backend.clone());
    }

    let mut session = ViewerSession::new(args.width, POINT_WIDTH);
    for id in &args.readsets {
        let query = ReadsetQuery {
            readset_id: Some(id.clone()),
            ..ReadsetQuery::default()
        };
        let response = client.readsets(&query).await?;
        debug!(readset = %id, sequences = response.ref_sequences().len(), "Loaded readset");
        session.add_readset(args.backend.clone(), id.clone(), response.ref_sequences().to_vec());
    }

    let range = resolve_range(&args, &mut session, &client).await?;
    if verbose {
        eprintln!(
            "Fetching {}:{}-{} from {}",
            range.sequence_name,
            range.start + 1,
            range.end,
            args.url
        );
    }

    let (fetcher, mut events) = ReadFetcher::spawn(client, config.fetch_config());
    fetcher.request(range);

    let mut result = None;
    while let Some(event) = events.recv().await {
        match event {
            FetchEvent::Layout {
                range,
                layout,
                complete,
                ..
            } => {
                info!(reads = layout.reads.len(), complete, "Layout updated");
                if complete {
                    result = Some((range, layout));
                    break;
                }
            }
            FetchEvent::Notification(n) if n.level == NotificationLevel::Error => {
                fetcher.shutdown().await;
                anyhow::bail!("{}", n.message);
            }
            // Integrity warnings are printed with the layout
            FetchEvent::Notification(_) | FetchEvent::Skipped { .. } => {}
        }
    }
    fetcher.shutdown().await;

    let (range, layout) =
        result.ok_or_else(|| anyhow::anyhow!("Fetch ended without a layout"))?;
    print_layout(&layout, &range.sequence_name, (range.start, range.end), format)
}

/// Work out which reads to fetch: an explicit region, a jump, or the middle
/// of a sequence at read level
async fn resolve_range(
    args: &FetchArgs,
    session: &mut ViewerSession,
    client: &ReadStoreClient,
) -> anyhow::Result<RangeRequest> {
    if let Some(region) = &args.region {
        let sequence = fuzzy_find_sequence(session.sequences(), &region.sequence)
            .ok_or_else(|| anyhow::anyhow!("Sequence '{}' not found", region.sequence))?;
        let (start, end) = region.to_range(sequence.length);
        return Ok(RangeRequest {
            readset_ids: session.readset_ids().to_vec(),
            sequence_name: sequence.name.clone(),
            start,
            end,
            query_type: QueryType::Reads,
        });
    }

    match args.at.as_deref().map(str::parse::<JumpTarget>).transpose()? {
        Some(JumpTarget::Snp(snp)) => {
            let response = client.snp(&snp).await?;
            session.jump_to_snp(&snp, &response)?;
        }
        Some(JumpTarget::Position(position)) => {
            let sequence = args
                .sequence
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--sequence is required with a numeric --at"))?;
            session.jump_to(position, Some(sequence), true, None)?;
        }
        None => {
            let sequence = args
                .sequence
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("Give a region, --at or --sequence"))?;
            session.select_sequence(sequence)?;
        }
    }

    session
        .range_request()
        .ok_or_else(|| anyhow::anyhow!("The view is too far zoomed out to show reads"))
}
