use bitflags::bitflags;

bitflags! {
    /// What a queue must be able to do.
    ///
    /// Bits are ordered least important to most important so that the raw
    /// value doubles as a sort key.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Capabilities: u32 {
        const TRANSFER = 1 << 0;
        const COMPUTE = 1 << 1;
        const GRAPHICS = 1 << 2;
        const PRESENTABLE = 1 << 3;
    }
}

impl Capabilities {
    /// Submission priority granted to a queue serving this request.
    pub fn priority(self) -> f32 {
        if self == Self::TRANSFER {
            0.5
        } else {
            1.0
        }
    }
}

/// Orders requests most important first so that sparse-queue devices hand
/// out their rare families before plain transfer requests claim them.
pub fn sort_by_importance(requests: &mut [Capabilities]) {
    requests.sort_by(|a, b| b.bits().cmp(&a.bits()));
}
