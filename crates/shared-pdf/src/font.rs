//! WinAnsi encoding and Helvetica metrics for overlay text

/// Emitted for characters WinAnsi cannot represent
const REPLACEMENT: u8 = b'?';

/// Helvetica advance widths in 1/1000 em, indexed by WinAnsi code.
/// Codes below 0x20 and the undefined slots are 0.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 256] = [
    // 0x00
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x10
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    // 0x20  space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0x30  0-9 : ; < = > ?
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    // 0x40  @ A-O
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    // 0x50  P-Z [ \ ] ^ _
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    // 0x60  ` a-o
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    // 0x70  p-z { | } ~
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, 0,
    // 0x80  Euro . quotesinglbase florin quotedblbase ellipsis dagger daggerdbl
    //       circumflex perthousand Scaron guilsinglleft OE . Zcaron .
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0,
    // 0x90  . quoteleft quoteright quotedblleft quotedblright bullet endash emdash
    //       tilde trademark scaron guilsinglright oe . zcaron Ydieresis
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667,
    // 0xA0  nbsp exclamdown cent sterling currency yen brokenbar section
    //       dieresis copyright ordfeminine guillemotleft logicalnot hyphen registered macron
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    // 0xB0  degree plusminus twosuperior threesuperior acute mu paragraph periodcentered
    //       cedilla onesuperior ordmasculine guillemotright onequarter onehalf threequarters questiondown
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    // 0xC0  Agrave-Aring AE Ccedilla Egrave-Edieresis Igrave-Idieresis
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    // 0xD0  Eth Ntilde Ograve-Odieresis multiply Oslash Ugrave-Udieresis Yacute Thorn germandbls
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    // 0xE0  agrave-aring ae ccedilla egrave-edieresis igrave-idieresis
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278,
    // 0xF0  eth ntilde ograve-odieresis divide oslash ugrave-udieresis yacute thorn ydieresis
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500,
];

/// WinAnsi code for a character, if the encoding has one
pub fn winansi_code(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

/// Encode a single line of text as WinAnsi bytes.
///
/// Line breaks and tabs become spaces, other control characters are
/// dropped, and unmappable characters become `?`.
pub fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| match c {
            '\n' | '\r' | '\t' => Some(b' '),
            c if c.is_control() => None,
            c => Some(winansi_code(c).unwrap_or(REPLACEMENT)),
        })
        .collect()
}

/// Width of already-encoded bytes in em
pub fn helvetica_width(encoded: &[u8]) -> f64 {
    encoded
        .iter()
        .map(|&b| f64::from(HELVETICA_WIDTHS[b as usize]))
        .sum::<f64>()
        / 1000.0
}

/// Width of `text` set in Helvetica, in em
pub fn text_width_em(text: &str) -> f64 {
    helvetica_width(&encode_winansi(text))
}
