use clap::ValueEnum;

/// Cutoffs that turn a max-normalized concentration grid into binary masks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskThresholds {
    pub flair: f32,
    pub t1c: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum MaskChannel {
    T1c,
    Flair,
}

impl MaskThresholds {
    pub fn default_v1() -> Self {
        Self {
            flair: 0.2,
            t1c: 0.6,
        }
    }

    pub fn cutoff(&self, channel: MaskChannel) -> f32 {
        match channel {
            MaskChannel::T1c => self.t1c,
            MaskChannel::Flair => self.flair,
        }
    }
}

impl Default for MaskThresholds {
    fn default() -> Self {
        Self::default_v1()
    }
}

impl MaskChannel {
    /// Upper-case tag used in output directory names.
    pub fn tag(self) -> &'static str {
        match self {
            MaskChannel::T1c => "T1C",
            MaskChannel::Flair => "FLAIR",
        }
    }
}
