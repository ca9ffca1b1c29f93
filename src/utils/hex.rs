
pub fn to_hex(s: &str) -> String {
    bytes_to_hex(s.as_bytes())
}

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut res = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        res.push(nibble_to_hex(b >> 4));
        res.push(nibble_to_hex(b & 0xf));
    }
    res
}

fn nibble_to_hex(n: u8) -> char {
    match n {
        0..=9 => (b'0' + n) as char,
        _ => (b'a' + n - 10) as char,
    }
}
