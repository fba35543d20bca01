//! Logging macros.
//!
//! Forward to `defmt` when the `defmt` feature is enabled and expand to
//! nothing otherwise, so call sites stay free of `cfg` attributes.
//!
//! Warnings go through `warning!`: a `warn!` import is ambiguous with the
//! built-in `#[warn]` attribute.

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)*);
    }};
}

macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)*);
    }};
}

macro_rules! warning {
    ($($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)*);
    }};
}

pub(crate) use {debug, info, warning};

#[cfg(test)]
mod tests {
    use super::{debug, info, warning};

    #[test]
    fn test_macros_expand_in_expression_position() {
        let axis = 2u8;
        let value = if axis > 1 {
            warning!("axis {} out of range", axis);
            info!("clamping");
            debug!("done");
            1
        } else {
            0
        };
        assert_eq!(value, 1);
    }
}
