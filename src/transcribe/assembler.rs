use std::future::Future;
use std::path::Path;

use crate::audio::Segment;

/// Joined transcript of a job plus the number of segments that yielded nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub text: String,
    pub empty_segments: usize,
}

/// Transcribe `segments` one after another in index order and join the non-empty texts
pub async fn assemble<'a, F, Fut>(segments: &'a [Segment], mut transcribe: F) -> Assembly
where
    F: FnMut(&'a Path) -> Fut,
    Fut: Future<Output = String>,
{
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    ordered.sort_by_key(|s| s.index);

    let mut parts = Vec::with_capacity(ordered.len());
    let mut empty_segments = 0;

    for segment in ordered {
        let text = transcribe(&segment.path).await;
        if text.is_empty() {
            tracing::warn!("No text for segment {} ({})", segment.index, segment.path.display());
            empty_segments += 1;
        } else {
            parts.push(text);
        }
    }

    Assembly {
        text: parts.join(" ").trim().to_string(),
        empty_segments,
    }
}
