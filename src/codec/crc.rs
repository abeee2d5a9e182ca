//! CRC-16 over the compressed payload

/// CCITT generator polynomial, processed MSB first
pub const POLYNOMIAL: u16 = 0x1021;

/// CRC-16 with polynomial 0x1021, initial value 0, no reflection, no final xor
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}
