//! NFC Data Exchange Format framing for the drink record.
//!
//! Only what the tags carry is supported: a message whose first record is a
//! Well-Known Text record (`TNF=0x01`, type `"T"`). Writing always produces a
//! single-record message; reading walks records until the first text record.

use thiserror::Error;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;
const TNF_WELL_KNOWN: u8 = 0x01;
const TEXT_TYPE: &[u8] = b"T";
const STATUS_UTF16: u8 = 0x80;
const STATUS_LANG_LEN_MASK: u8 = 0x3f;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NdefError {
    #[error("message is empty")]
    Empty,
    #[error("first record does not carry the message-begin flag")]
    MissingMessageBegin,
    #[error("record truncated at byte {0}")]
    Truncated(usize),
    #[error("chunked records are not supported")]
    Chunked,
    #[error("no text record in message")]
    NoTextRecord,
    #[error("language code longer than text payload")]
    BadLanguageLength,
}

/// A decoded Well-Known Text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub language: String,
    pub text: String,
}

/// Frame `text` as a one-record NDEF message with an `en` text record.
pub fn encode_text(text: &str) -> Vec<u8> {
    encode_text_with_language(text, "en")
}

pub fn encode_text_with_language(text: &str, language: &str) -> Vec<u8> {
    let lang = &language.as_bytes()[..language.len().min(STATUS_LANG_LEN_MASK as usize)];
    let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
    payload.push(lang.len() as u8);
    payload.extend_from_slice(lang);
    payload.extend_from_slice(text.as_bytes());

    let short = payload.len() <= u8::MAX as usize;
    let mut header = FLAG_MB | FLAG_ME | TNF_WELL_KNOWN;
    if short {
        header |= FLAG_SR;
    }

    let mut out = Vec::with_capacity(payload.len() + 7);
    out.push(header);
    out.push(TEXT_TYPE.len() as u8);
    if short {
        out.push(payload.len() as u8);
    } else {
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(TEXT_TYPE);
    out.extend_from_slice(&payload);
    out
}

/// Parse an NDEF message and return its first text record.
pub fn decode_text(message: &[u8]) -> Result<TextRecord, NdefError> {
    if message.is_empty() {
        return Err(NdefError::Empty);
    }
    if message[0] & FLAG_MB == 0 {
        return Err(NdefError::MissingMessageBegin);
    }

    let mut pos = 0;
    while pos < message.len() {
        let header = message[pos];
        if header & FLAG_CF != 0 {
            return Err(NdefError::Chunked);
        }
        let mut cursor = pos + 1;
        let type_len = *message.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
        cursor += 1;

        let payload_len = if header & FLAG_SR != 0 {
            let len = *message.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
            cursor += 1;
            len
        } else {
            let bytes = message
                .get(cursor..cursor + 4)
                .ok_or(NdefError::Truncated(cursor))?;
            cursor += 4;
            u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize
        };

        let id_len = if header & FLAG_IL != 0 {
            let len = *message.get(cursor).ok_or(NdefError::Truncated(cursor))? as usize;
            cursor += 1;
            len
        } else {
            0
        };

        let record_type = message
            .get(cursor..cursor + type_len)
            .ok_or(NdefError::Truncated(cursor))?;
        cursor += type_len + id_len;
        let payload = message
            .get(cursor..cursor + payload_len)
            .ok_or(NdefError::Truncated(cursor))?;

        if header & TNF_MASK == TNF_WELL_KNOWN && record_type == TEXT_TYPE {
            return parse_text_payload(payload);
        }

        if header & FLAG_ME != 0 {
            break;
        }
        pos = cursor + payload_len;
    }

    Err(NdefError::NoTextRecord)
}

fn parse_text_payload(payload: &[u8]) -> Result<TextRecord, NdefError> {
    let (&status, rest) = payload.split_first().ok_or(NdefError::Truncated(0))?;
    let lang_len = (status & STATUS_LANG_LEN_MASK) as usize;
    if lang_len > rest.len() {
        return Err(NdefError::BadLanguageLength);
    }
    let (lang, body) = rest.split_at(lang_len);

    let text = if status & STATUS_UTF16 != 0 {
        decode_utf16(body)
    } else {
        String::from_utf8_lossy(body).into_owned()
    };

    Ok(TextRecord {
        language: String::from_utf8_lossy(lang).into_owned(),
        text,
    })
}

fn decode_utf16(body: &[u8]) -> String {
    let (little_endian, body) = match body {
        [0xff, 0xfe, rest @ ..] => (true, rest),
        [0xfe, 0xff, rest @ ..] => (false, rest),
        _ => (false, body),
    };
    let units = body.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
