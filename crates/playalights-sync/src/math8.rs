/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems. A full scale of 255
/// leaves the value untouched.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn scale8(value: u8, scale: u8) -> u8 {
    if scale == 255 {
        return value;
    }
    ((u16::from(value) * u16::from(scale)) >> 8) as u8
}

/// Perceptual gamma correction (gamma 2.0)
///
/// Zero stays zero, so dark gaps in a pattern survive the correction.
#[inline]
#[allow(clippy::cast_possible_truncation)]
pub fn gamma8(value: u8) -> u8 {
    let v = u16::from(value);
    ((v * v + 255) >> 8) as u8
}

/// Convert a unit scalar (0.0-1.0) to an 8-bit value
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn unit_to_u8(value: f32) -> u8 {
    let clamped = value.clamp(0.0, 1.0);
    libm::roundf(clamped * 255.0) as u8
}
