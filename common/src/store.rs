use crate::channel::{Channel, Sample};

/// Latest-value cache of the monitor, one slot per configured channel.
///
/// Only the sampling task writes; the uplinks read. The whole loop runs on
/// one thread, so the store is a plain owned value without any locking.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    slots: Vec<(Channel, Sample)>,
}

impl SampleStore {
    /// Creates a store with an invalid sample for each channel, in the given order.
    /// Duplicate channels are ignored.
    pub fn new(channels: &[Channel]) -> Self {
        let mut slots: Vec<(Channel, Sample)> = Vec::with_capacity(channels.len());
        for channel in channels {
            if !slots.iter().any(|(c, _)| c == channel) {
                slots.push((*channel, Sample::invalid(0)));
            }
        }
        Self { slots }
    }

    /// Replaces the sample of `channel`.
    ///
    /// Returns `false` if the channel is not part of this store.
    pub fn set(&mut self, channel: Channel, sample: Sample) -> bool {
        match self.slots.iter_mut().find(|(c, _)| *c == channel) {
            Some((_, slot)) => {
                *slot = sample;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, channel: Channel) -> Option<Sample> {
        self.slots
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, sample)| *sample)
    }

    /// Value of `channel` if it is valid, `0.0` otherwise.
    pub fn value_or_zero(&self, channel: Channel) -> f32 {
        self.get(channel).and_then(|s| s.reading()).unwrap_or(0.0)
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.slots.iter().map(|(c, _)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, Sample)> + '_ {
        self.slots.iter().copied()
    }

    pub fn any_valid(&self) -> bool {
        self.slots.iter().any(|(_, s)| s.valid)
    }

    /// Renders the per-cycle readings line, e.g.
    /// `Heart Rate: 72.3 bpm | SpO2: -- | Temperature: 36.5 °C`.
    pub fn status_line(&self) -> String {
        self.slots
            .iter()
            .map(|(channel, sample)| match sample.reading() {
                Some(value) => format!("{}: {:.1} {}", channel, value, channel.unit()),
                None if *channel == Channel::HeartRate => {
                    format!("{}: -- (Place finger on sensor)", channel)
                }
                None => format!("{}: --", channel),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
