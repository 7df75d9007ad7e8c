//! Segment reconstruction engine.
//!
//! Converts fixed-width genomic bins (each carrying an aggregated
//! copy-number state) into the minimal sequence of merged [`Seg`]s: a
//! run-length encoding over the coordinate-sorted bins of one chromosome.
//! Adjacent bins merge when their rounded states are equal, so the output
//! never contains two neighbouring segments with the same reported state.

use cellgraph_search_protocol::{AggregationBucket, ResultShapeError, BIN_WIDTH};

use crate::entities::Seg;
use crate::error::{GatewayError, Result};

/// One fixed-width coordinate bin with its aggregated state.
///
/// `key` is the bin's start coordinate as produced by the histogram
/// aggregation; `state` may be fractional (a mean or mode over the bin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateBin {
    pub key: i64,
    pub state: f64,
}

/// Extract [`StateBin`]s from one chromosome's histogram buckets.
///
/// A bin whose state terms aggregation has no buckets indicates corrupt
/// backend data and fails the chromosome's reconstruction.
pub fn bins_from_buckets(
    chromosome: &str,
    buckets: &[AggregationBucket],
) -> Result<Vec<StateBin>> {
    buckets
        .iter()
        .map(|bucket| {
            let key = bucket
                .key_i64()
                .ok_or_else(|| ResultShapeError::MalformedBuckets {
                    name: "bins".to_string(),
                })?;

            let states = bucket.sub_buckets("state")?;
            let state = states
                .first()
                .and_then(AggregationBucket::key_f64)
                .ok_or_else(|| GatewayError::MissingBinState {
                    chromosome: chromosome.to_string(),
                    key,
                })?;

            Ok(StateBin { key, state })
        })
        .collect()
}

/// Merge one chromosome's coordinate-sorted bins into maximal same-state
/// segments.
///
/// The first bin's segment starts at coordinate 0 when its key is 0;
/// every later run starts at `key + 1`. Each bin extends a run's end to
/// `key + BIN_WIDTH`. States are rounded to the nearest integer before
/// comparison, so fractional aggregates that round together form one run.
pub fn reconstruct_chromosome(chromosome: &str, bins: &[StateBin]) -> Vec<Seg> {
    let mut iter = bins.iter();
    let first = match iter.next() {
        Some(bin) => bin,
        None => return Vec::new(),
    };

    let mut segs = Vec::new();
    let mut current = seed_seg(chromosome, first);

    for bin in iter {
        let state = round_state(bin.state);
        if state == current.state {
            current.end = bin.key + BIN_WIDTH;
        } else {
            segs.push(current);
            current = seed_seg(chromosome, bin);
        }
    }
    segs.push(current);

    segs
}

/// Reconstruct segments for every chromosome bucket of a bin aggregation,
/// concatenated in bucket (ascending chromosome-key) order.
pub fn reconstruct_from_buckets(chromosome_buckets: &[AggregationBucket]) -> Result<Vec<Seg>> {
    let mut segs = Vec::new();

    for chromosome_bucket in chromosome_buckets {
        let chromosome = chromosome_bucket.key_string();
        let bin_buckets = chromosome_bucket.sub_buckets("bins")?;
        let bins = bins_from_buckets(&chromosome, &bin_buckets)?;
        segs.extend(reconstruct_chromosome(&chromosome, &bins));
    }

    Ok(segs)
}

fn seed_seg(chromosome: &str, bin: &StateBin) -> Seg {
    Seg {
        chromosome: chromosome.to_string(),
        start: if bin.key == 0 { 0 } else { bin.key + 1 },
        end: bin.key + BIN_WIDTH,
        state: round_state(bin.state),
        integer_median: None,
    }
}

fn round_state(state: f64) -> i64 {
    state.round() as i64
}
