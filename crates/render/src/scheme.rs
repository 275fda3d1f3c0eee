//! Class palette for flood composites

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// RGBA bytes with the given alpha
    pub const fn with_alpha(self, a: u8) -> [u8; 4] {
        [self.r, self.g, self.b, a]
    }
}

/// Water classes drawn on the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloodClass {
    /// Permanent water the imagery no longer sees
    Lost,
    /// Water the imagery sees outside permanent water
    Gained,
    /// Water present in both
    Persistent,
}

impl FloodClass {
    /// Drawing order; later classes paint over earlier ones.
    pub const ALL: &[FloodClass] = &[Self::Lost, Self::Gained, Self::Persistent];

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lost => "Lost",
            Self::Gained => "Gained",
            Self::Persistent => "Persistent",
        }
    }

    /// Fill color of the class
    pub fn color(&self) -> Rgb {
        match self {
            Self::Lost => AMBER,
            Self::Gained => BLUE,
            Self::Persistent => PURPLE,
        }
    }
}

pub const AMBER: Rgb = Rgb::new(255, 191, 0);
pub const BLUE: Rgb = Rgb::new(0, 102, 255);
pub const PURPLE: Rgb = Rgb::new(128, 0, 128);

/// Fully transparent pixel
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_have_distinct_colors() {
        let colors: Vec<Rgb> = FloodClass::ALL.iter().map(|c| c.color()).collect();
        assert_eq!(colors.len(), 3);
        assert_ne!(colors[0], colors[1]);
        assert_ne!(colors[1], colors[2]);
        assert_ne!(colors[0], colors[2]);
    }

    #[test]
    fn with_alpha_packs_rgba() {
        assert_eq!(BLUE.with_alpha(180), [0, 102, 255, 180]);
    }
}
