//! Per-read metadata for the basecaller's read step.

use crate::error::{ErrorKind, Result};
use crate::open::Opener;
use crate::vpath::{Convention, Location};
use exn::{OptionExt, ResultExt};
use multiread_container::{Attributes, Record};
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime, UtcOffset};

const DEFAULT_SAMPLE_ID: &str = "none";

/// Everything the pipeline needs to know about one read, whether it came from
/// a single-record file or out of a multi-record container.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadMetadata {
    /// File name of the path the read was requested by.
    pub data_id: String,
    pub read_id: String,
    /// Always 0 for reads taken from a multi-record container.
    pub read_number: u32,
    pub start_time: u64,
    pub duration: u64,
    pub start_mux: u8,
    pub median_before: f64,
    pub channel_id: String,
    pub sampling_rate: f64,
    pub run_id: String,
    pub flowcell_id: String,
    pub device_id: String,
    pub hostname: String,
    pub exp_start_time: String,
    pub sample_id: String,
    /// File stem of the requested path.
    pub label: String,
    /// Experiment start plus the read's start offset, RFC 3339 in UTC.
    pub start_time_utc: String,
    /// Signal in picoamperes, truncated to `duration` samples.
    pub signal: Vec<f64>,
    pub tracking_id: Attributes,
    pub context_tags: Attributes,
}

impl ReadMetadata {
    /// Resolve `path` (plain or virtual) and load its read.
    #[tracing::instrument(skip(opener, convention), fields(path = %path.display()))]
    pub fn load(opener: &Opener, convention: &Convention, path: &Path) -> Result<Self> {
        let location = opener.locate(path, convention);
        let record = opener.read_location(&location)?;
        let multi = matches!(location, Location::Record { .. });
        let data_id = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        let label = path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();
        Self::from_record(record, data_id, label, multi)
    }

    fn from_record(record: Record, data_id: String, label: String, multi: bool) -> Result<Self> {
        let tracking = |key: &'static str| -> Result<String> {
            record.tracking_id.get(key).cloned().ok_or_raise(|| ErrorKind::MissingAttribute(key))
        };
        let run_id = tracking("run_id")?;
        let flowcell_id = tracking("flow_cell_id")?;
        let device_id = tracking("device_id")?;
        let hostname = tracking("hostname")?;
        let exp_start_time = tracking("exp_start_time")?;
        let sample_id = record.tracking_id.get("sample_id").cloned().unwrap_or_else(|| DEFAULT_SAMPLE_ID.to_string());
        let start_time_utc = start_time_utc(&exp_start_time, record.start_time, record.channel.sampling_rate)?;

        Ok(Self {
            data_id,
            signal: record.scaled_signal(),
            read_number: if multi { 0 } else { record.read_number },
            start_time: record.start_time,
            duration: record.duration,
            start_mux: record.start_mux.unwrap_or(0),
            median_before: record.median_before.unwrap_or(-1.0),
            channel_id: record.channel.channel_number,
            sampling_rate: record.channel.sampling_rate,
            read_id: record.id,
            run_id,
            flowcell_id,
            device_id,
            hostname,
            exp_start_time,
            sample_id,
            label,
            start_time_utc,
            tracking_id: record.tracking_id,
            context_tags: record.context_tags,
        })
    }
}

/// `exp_start_time` is either RFC 3339 or whole seconds since the epoch,
/// depending on the firmware that wrote the file.
fn parse_exp_start(value: &str) -> Result<OffsetDateTime> {
    let value = value.trim();
    let parsed = match value.parse::<i64>() {
        Ok(seconds) => OffsetDateTime::from_unix_timestamp(seconds).map_err(time::Error::from),
        Err(_) => OffsetDateTime::parse(value, &Rfc3339).map_err(time::Error::from),
    };
    parsed.or_raise(|| ErrorKind::InvalidAttribute("exp_start_time"))
}

fn start_time_utc(exp_start_time: &str, start_time: u64, sampling_rate: f64) -> Result<String> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        exn::bail!(ErrorKind::InvalidAttribute("sampling_rate"));
    }
    let offset = Duration::checked_seconds_f64(start_time as f64 / sampling_rate)
        .ok_or_raise(|| ErrorKind::InvalidAttribute("start_time"))?;
    let start = parse_exp_start(exp_start_time)?
        .checked_add(offset)
        .ok_or_raise(|| ErrorKind::InvalidAttribute("start_time"))?
        .to_offset(UtcOffset::UTC);
    start.format(&Rfc3339).or_raise(|| ErrorKind::InvalidAttribute("start_time"))
}
