use super::*;

fn be_u16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

fn be_i16(b: &[u8], at: usize) -> i16 {
    i16::from_be_bytes([b[at], b[at + 1]])
}

fn be_u32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn be_i32(b: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

const RECORD_START: usize = 44;

fn single_layer_doc<'a>(pixels: &'a [u8], composite: &'a [u8], name: &'a str) -> PsdDocument<'a> {
    PsdDocument {
        canvas: Canvas {
            width: 3,
            height: 2,
        },
        layers: vec![PsdLayer {
            name,
            bounds: PixelRect::from_origin_size(-1, 1, 2, 1),
            opacity: 0.5,
            rgba8: pixels,
        }],
        composite,
    }
}

#[test]
fn header_describes_rgb_8bit_four_channels() {
    let pixels = [10u8; 8];
    let composite = [0u8; 24];
    let bytes = encode_psd(&single_layer_doc(&pixels, &composite, "A"), Compression::Rle).unwrap();

    assert_eq!(&bytes[0..4], b"8BPS");
    assert_eq!(be_u16(&bytes, 4), 1);
    assert_eq!(&bytes[6..12], &[0; 6]);
    assert_eq!(be_u16(&bytes, 12), 4);
    assert_eq!(be_u32(&bytes, 14), 2);
    assert_eq!(be_u32(&bytes, 18), 3);
    assert_eq!(be_u16(&bytes, 22), 8);
    assert_eq!(be_u16(&bytes, 24), 3);
    assert_eq!(be_u32(&bytes, 26), 0);
    assert_eq!(be_u32(&bytes, 30), 0);
}

#[test]
fn layer_record_carries_bounds_opacity_and_names() {
    let pixels = [10u8; 8];
    let composite = [0u8; 24];
    let bytes =
        encode_psd(&single_layer_doc(&pixels, &composite, "Süd"), Compression::Raw).unwrap();

    let section_len = be_u32(&bytes, 34) as usize;
    assert_eq!(34 + 4 + section_len + 2 + 24, bytes.len());
    let info_len = be_u32(&bytes, 38) as usize;
    assert_eq!(info_len % 2, 0);
    assert_eq!(be_i16(&bytes, 42), -1);

    let r = RECORD_START;
    assert_eq!(be_i32(&bytes, r), 1);
    assert_eq!(be_i32(&bytes, r + 4), -1);
    assert_eq!(be_i32(&bytes, r + 8), 2);
    assert_eq!(be_i32(&bytes, r + 12), 1);
    assert_eq!(be_u16(&bytes, r + 16), 4);
    let ids: Vec<i16> = (0..4).map(|i| be_i16(&bytes, r + 18 + i * 6)).collect();
    assert_eq!(ids, vec![-1, 0, 1, 2]);
    for i in 0..4 {
        // compression word + 2 raw pixels
        assert_eq!(be_u32(&bytes, r + 20 + i * 6), 4);
    }

    let blend = r + 42;
    assert_eq!(&bytes[blend..blend + 8], b"8BIMnorm");
    assert_eq!(bytes[blend + 8], 128);
    assert_eq!(bytes[blend + 10], 0);

    let extra = blend + 12;
    let extra_len = be_u32(&bytes, extra) as usize;
    let name_at = extra + 12;
    assert_eq!(bytes[name_at], 3);
    assert_eq!(&bytes[name_at + 1..name_at + 4], b"S?d");
    let luni = name_at + 4;
    assert_eq!(&bytes[luni..luni + 8], b"8BIMluni");
    assert_eq!(be_u32(&bytes, luni + 12), 3);
    assert_eq!(be_u16(&bytes, luni + 18), 'ü' as u16);
    assert_eq!(extra + 4 + extra_len, luni + 8 + 4 + be_u32(&bytes, luni + 8) as usize);
}

#[test]
fn raw_merged_image_is_planar_rgba_at_the_end() {
    let pixels = [0u8; 8];
    let composite: Vec<u8> = (0..6u8).flat_map(|i| [i, 10 + i, 20 + i, 255]).collect();
    let bytes = encode_psd(&single_layer_doc(&pixels, &composite, "A"), Compression::Raw).unwrap();

    let tail = &bytes[bytes.len() - 26..];
    assert_eq!(be_u16(tail, 0), 0);
    assert_eq!(&tail[2..8], &[0, 1, 2, 3, 4, 5]);
    assert_eq!(&tail[8..14], &[10, 11, 12, 13, 14, 15]);
    assert_eq!(&tail[14..20], &[20, 21, 22, 23, 24, 25]);
    assert_eq!(&tail[20..26], &[255; 6]);
}

#[test]
fn rle_merged_image_lists_row_counts_for_every_channel() {
    let pixels = [0u8; 8];
    let composite = [9u8; 24];
    let bytes = encode_psd(&single_layer_doc(&pixels, &composite, "A"), Compression::Rle).unwrap();

    // 3 identical bytes per row pack into a 2-byte run.
    let tail = &bytes[bytes.len() - (2 + 8 * 2 + 8 * 2)..];
    assert_eq!(be_u16(tail, 0), 1);
    for i in 0..8 {
        assert_eq!(be_u16(tail, 2 + i * 2), 2);
    }
    assert_eq!(&tail[18..20], &[0xFE, 9]);
}

#[test]
fn zero_area_layer_writes_bare_compression_words() {
    let composite = [0u8; 24];
    let doc = PsdDocument {
        canvas: Canvas {
            width: 3,
            height: 2,
        },
        layers: vec![PsdLayer {
            name: "empty",
            bounds: PixelRect::from_origin_size(1, 1, 0, 0),
            opacity: 1.0,
            rgba8: &[],
        }],
        composite: &composite,
    };
    let bytes = encode_psd(&doc, Compression::Rle).unwrap();
    for i in 0..4 {
        assert_eq!(be_u32(&bytes, RECORD_START + 20 + i * 6), 2);
    }
    assert_eq!(bytes[RECORD_START + 42 + 10], 0);
}

#[test]
fn rejects_mismatched_buffers_and_oversized_canvas() {
    let pixels = [0u8; 4];
    let composite = [0u8; 24];
    let err = encode_psd(&single_layer_doc(&pixels, &composite, "A"), Compression::Rle).unwrap_err();
    assert!(err.to_string().contains("layer 0"));

    let pixels = [0u8; 8];
    let short = [0u8; 20];
    let err = encode_psd(&single_layer_doc(&pixels, &short, "A"), Compression::Rle).unwrap_err();
    assert!(err.to_string().contains("composite"));

    let big = PsdDocument {
        canvas: Canvas {
            width: PSD_MAX_DIMENSION + 1,
            height: 1,
        },
        layers: vec![],
        composite: &[],
    };
    assert!(encode_psd(&big, Compression::Raw).is_err());
}

#[test]
fn document_without_layers_has_empty_layer_info() {
    let composite = [0u8; 24];
    let doc = PsdDocument {
        canvas: Canvas {
            width: 3,
            height: 2,
        },
        layers: vec![],
        composite: &composite,
    };
    let bytes = encode_psd(&doc, Compression::Raw).unwrap();
    assert_eq!(be_u32(&bytes, 34), 8);
    assert_eq!(be_u32(&bytes, 38), 0);
    assert_eq!(bytes.len(), 34 + 12 + 2 + 24);
}
