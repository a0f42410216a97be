/// Bundled 1x1 grey PNG shown in place of a photo that could not be
/// downloaded or decoded.
pub const PLACEHOLDER_IMAGE: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x00, 0x00, 0x00, 0x00, 0x3a, 0x7e, 0x9b,
    0x55, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x38, 0x00, 0x00, 0x00,
    0xc2, 0x00, 0xc1, 0xff, 0xd6, 0x2d, 0xdc, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae,
    0x42, 0x60, 0x82,
];

pub fn is_placeholder(image: &[u8]) -> bool {
    image == PLACEHOLDER_IMAGE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_decodes() {
        let decoded = image::load_from_memory(PLACEHOLDER_IMAGE).expect("placeholder must decode");
        assert_eq!(decoded.width(), 1);
        assert_eq!(decoded.height(), 1);
    }

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder(PLACEHOLDER_IMAGE));
        assert!(!is_placeholder(b"not an image"));
    }
}
