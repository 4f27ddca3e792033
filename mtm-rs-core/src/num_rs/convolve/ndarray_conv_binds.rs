use super::ConvolveMode;
use ndarray_conv::ConvMode;

impl From<ConvolveMode> for ConvMode<1> {
    fn from(mode: ConvolveMode) -> Self {
        match mode {
            ConvolveMode::Full => ConvMode::Full,
            ConvolveMode::Valid => ConvMode::Valid,
            ConvolveMode::Same => ConvMode::Same,
        }
    }
}
