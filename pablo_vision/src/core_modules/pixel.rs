// THEORY (packed pixel heuristics):
// The `Pixel` module is the most fundamental unit of the vision system. The sensor
// delivers RGB565, two bytes per pixel, high byte first. A `Pixel` is the "dumb"
// data container for one of those after the 5/6-bit channels have been widened back
// to 8 bits by bit replication (so 0x1F becomes 0xFF, not 0xF8).
//
// The only heuristic computed here is the integer HSV triple that the color
// classifier consumes. It mirrors the fixed-point conversion used on
// the sensor module rather than a float colorimetry:
// - value      = max channel
// - saturation = delta * 255 / max (0 when max is 0)
// - hue        = sextant arithmetic scaled to 0..=179 (30 units per half sextant),
//                negative results wrapped by +180
// All divisions truncate toward zero. Anything that needs neighbours belongs in the
// mask/morphology layer, not here.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = u8;
    pub type Packed = u16;
    pub type Hue = u8;
    pub type Saturation = u8;
    pub type Value = u8;

    /// Width of one packed pixel in the frame buffer.
    pub const BYTES_PER_PIXEL: usize = 2;
    /// Hue is expressed on a half-degree wheel: 0..=179.
    pub const HUE_RANGE: i16 = 180;

    /// A "dumb" data container representing a single pixel widened to RGB888.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
    }

    /// Hue/saturation/value in the sensor's integer scale.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hsv {
        /// 0..=179
        pub hue: Hue,
        /// 0..=255
        pub saturation: Saturation,
        /// 0..=255
        pub value: Value,
    }

    impl Hsv {
        pub const fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
            Self {
                hue,
                saturation,
                value,
            }
        }
    }

    impl Pixel {
        pub const fn new(red: Channel, green: Channel, blue: Channel) -> Self {
            Pixel { red, green, blue }
        }

        /// Unpacks a 5/6/5 word, replicating the high bits into the low ones.
        pub fn from_rgb565(packed: Packed) -> Self {
            let r5 = ((packed >> 11) & 0x1F) as u8;
            let g6 = ((packed >> 5) & 0x3F) as u8;
            let b5 = (packed & 0x1F) as u8;

            Pixel {
                red: (r5 << 3) | (r5 >> 2),
                green: (g6 << 2) | (g6 >> 4),
                blue: (b5 << 3) | (b5 >> 2),
            }
        }

        /// Packs back to 5/6/5 by dropping the low bits of each channel.
        pub fn to_rgb565(&self) -> Packed {
            ((self.red as Packed >> 3) << 11) | ((self.green as Packed >> 2) << 5) | (self.blue as Packed >> 3)
        }

        pub fn to_be_bytes(&self) -> [Byte; BYTES_PER_PIXEL] {
            self.to_rgb565().to_be_bytes()
        }

        /// Converts to the integer HSV triple.
        pub fn hsv(&self) -> Hsv {
            let (r, g, b) = (self.red, self.green, self.blue);
            let max_val = r.max(g).max(b);
            let min_val = r.min(g).min(b);
            let delta = max_val - min_val;

            if max_val == 0 {
                return Hsv::new(0, 0, 0);
            }

            let saturation = (delta as u16 * 255 / max_val as u16) as Saturation;
            if delta == 0 {
                return Hsv::new(0, saturation, max_val);
            }

            let (r, g, b, delta) = (r as i16, g as i16, b as i16, delta as i16);
            let mut hue = if max_val == self.red {
                30 * (g - b) / delta
            } else if max_val == self.green {
                60 + 30 * (b - r) / delta
            } else {
                120 + 30 * (r - g) / delta
            };
            if hue < 0 {
                hue += HUE_RANGE;
            }

            Hsv::new(hue as Hue, saturation, max_val)
        }
    }

    impl From<[Byte; BYTES_PER_PIXEL]> for Pixel {
        fn from(bytes: [Byte; BYTES_PER_PIXEL]) -> Self {
            Pixel::from_rgb565(Packed::from_be_bytes(bytes))
        }
    }

    impl From<Pixel> for [Byte; 3] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue]
        }
    }
}
