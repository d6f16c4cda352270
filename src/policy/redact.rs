use std::ops::Range;

use crate::catalog::{ContentScan, PatternCatalog};

/// Replace every matched span in `text` with its category placeholder.
///
/// Overlapping or touching spans are merged; the merged span takes the
/// placeholder of its most severe member (critical, then internal, then
/// sensitive).
pub(crate) fn redact(text: &str, scan: &ContentScan, catalog: &PatternCatalog) -> String {
    let mut spans: Vec<(Range<usize>, usize, &str)> = Vec::new();
    for (rank, group) in [&scan.critical, &scan.internal, &scan.sensitive]
        .into_iter()
        .enumerate()
    {
        for m in group {
            if m.span.start < m.span.end
                && m.span.end <= text.len()
                && text.is_char_boundary(m.span.start)
                && text.is_char_boundary(m.span.end)
            {
                spans.push((m.span.clone(), rank, catalog.placeholder(&m.kind)));
            }
        }
    }
    if spans.is_empty() {
        return text.to_string();
    }

    spans.sort_by(|a, b| a.0.start.cmp(&b.0.start).then(a.1.cmp(&b.1)));
    let mut merged: Vec<(Range<usize>, usize, &str)> = Vec::with_capacity(spans.len());
    for (span, rank, placeholder) in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.0.end => {
                last.0.end = last.0.end.max(span.end);
                if rank < last.1 {
                    last.1 = rank;
                    last.2 = placeholder;
                }
            }
            _ => merged.push((span, rank, placeholder)),
        }
    }

    let mut out = text.to_string();
    for (span, _, placeholder) in merged.into_iter().rev() {
        out.replace_range(span, placeholder);
    }
    out
}
