//! Stream quality heuristics

/// Streams below this framerate are flagged as low framerate
pub const LOW_FRAMERATE_THRESHOLD: f64 = 30.0;

/// Resolution class claimed by a channel name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Uhd4k,
    FullHd,
    Hd,
}

impl QualityTier {
    /// Detect the claimed tier from a display name.
    ///
    /// Tokens are checked highest tier first, so "4K HD" counts as 4K.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_uppercase();
        if upper.contains("4K") {
            Some(QualityTier::Uhd4k)
        } else if upper.contains("1080P") || upper.contains("FHD") {
            Some(QualityTier::FullHd)
        } else if upper.contains("720P") || upper.contains("HD") {
            Some(QualityTier::Hd)
        } else {
            None
        }
    }

    /// Minimum (width, height) a stream needs to live up to this tier
    pub fn min_dimensions(&self) -> (u32, u32) {
        match self {
            QualityTier::Uhd4k => (3840, 2160),
            QualityTier::FullHd => (1920, 1080),
            QualityTier::Hd => (1280, 720),
        }
    }
}

/// A framerate of 0 means unknown and is never flagged
pub fn is_low_framerate(framerate_num: f64) -> bool {
    framerate_num > 0.0 && framerate_num < LOW_FRAMERATE_THRESHOLD
}

/// Whether the measured resolution falls short of the tier claimed in `name`
pub fn is_mislabeled(name: &str, resolution: &str) -> bool {
    let Some((width, height)) = parse_resolution(resolution) else {
        return false;
    };

    match QualityTier::from_name(name) {
        Some(tier) => {
            let (min_w, min_h) = tier.min_dimensions();
            width < min_w || height < min_h
        }
        None => false,
    }
}

/// Parse a "WIDTHxHEIGHT" string
pub fn parse_resolution(resolution: &str) -> Option<(u32, u32)> {
    let (w, h) = resolution.split_once('x')?;
    Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
}
