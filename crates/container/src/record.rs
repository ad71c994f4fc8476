//! Record models.
//!
//! A [`Record`] is one read: raw signal samples plus the metadata needed to
//! interpret them. These types are deliberately plain data; the container
//! format decides how they are laid out on disk.

use std::collections::BTreeMap;

/// Attribute map (tracking ID, context tags). Ordered so that written
/// containers are deterministic.
pub type Attributes = BTreeMap<String, String>;

/// Channel calibration for a record's raw signal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelInfo {
    pub channel_number: String,
    pub sampling_rate: f64,
    pub digitisation: f64,
    pub offset: f64,
    pub range: f64,
}

impl ChannelInfo {
    /// Convert a raw ADC sample to picoamperes.
    #[inline]
    #[must_use]
    pub fn scale(&self, raw: i16) -> f64 {
        (f64::from(raw) + self.offset) * self.range / self.digitisation
    }
}

/// One self-describing record held by a container.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    /// Unique within its container.
    pub id: String,
    pub read_number: u32,
    /// Start time, in samples since the start of the experiment.
    pub start_time: u64,
    /// Duration, in samples.
    pub duration: u64,
    pub start_mux: Option<u8>,
    pub median_before: Option<f64>,
    pub signal: Vec<i16>,
    pub channel: ChannelInfo,
    pub tracking_id: Attributes,
    pub context_tags: Attributes,
}

impl Record {
    /// Signal converted to picoamperes, truncated to the record's duration.
    pub fn scaled_signal(&self) -> Vec<f64> {
        let end = usize::try_from(self.duration).unwrap_or(usize::MAX).min(self.signal.len());
        self.signal[..end].iter().map(|&raw| self.channel.scale(raw)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ChannelInfo {
        ChannelInfo {
            channel_number: "42".to_string(),
            sampling_rate: 4000.0,
            digitisation: 8192.0,
            offset: 10.0,
            range: 1400.0,
        }
    }

    #[test]
    fn test_scale() {
        let channel = channel();
        assert_eq!(channel.scale(-10), 0.0);
        assert!((channel.scale(8182) - 1400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scaled_signal_truncates_to_duration() {
        let record = Record {
            id: "r1".to_string(),
            read_number: 7,
            start_time: 0,
            duration: 2,
            start_mux: None,
            median_before: None,
            signal: vec![-10, -10, 500],
            channel: channel(),
            tracking_id: Attributes::new(),
            context_tags: Attributes::new(),
        };
        assert_eq!(record.scaled_signal(), vec![0.0, 0.0]);
    }
}
