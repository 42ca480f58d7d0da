/// Number of micrometers, the unit imzML uses for lengths, in one millimeter,
/// the unit used for image geometry.
pub const MICROMETERS_PER_MILLIMETER: f64 = 1000.0;

#[inline]
pub fn micrometer_to_millimeter(value: f64) -> f64 {
    value / MICROMETERS_PER_MILLIMETER
}
