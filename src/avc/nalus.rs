const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// H.264 NAL unit types the capture path cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    NonIDR,
    IDR,
    SEI,
    SPS,
    PPS,
    AUD,
    Other(u8),
}

impl NaluType {
    pub fn from_header_byte(header: u8) -> Self {
        match header & 0x1f {
            1 => Self::NonIDR,
            5 => Self::IDR,
            6 => Self::SEI,
            7 => Self::SPS,
            8 => Self::PPS,
            9 => Self::AUD,
            other => Self::Other(other),
        }
    }
}

/// One NAL unit, header byte included, without framing
#[derive(Debug, Clone, PartialEq)]
pub struct Nalu {
    pub nalu_type: NaluType,
    pub data: Vec<u8>,
}

impl Nalu {
    pub fn new(data: Vec<u8>) -> Option<Self> {
        let header = *data.first()?;
        Some(Self {
            nalu_type: NaluType::from_header_byte(header),
            data,
        })
    }
}

/// Split an MP4 sample (big-endian 4-byte length before each unit).
/// `None` when a length runs past the end of the sample.
pub fn extract_nalus_from_sample(sample: &[u8]) -> Option<Vec<Nalu>> {
    if sample.len() < 4 {
        return None;
    }
    let mut rest = sample;
    let mut nalus = Vec::new();
    while rest.len() >= 4 {
        let (prefix, tail) = rest.split_at(4);
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        if len > tail.len() {
            return None;
        }
        let (unit, tail) = tail.split_at(len);
        nalus.extend(Nalu::new(unit.to_vec()));
        rest = tail;
    }
    Some(nalus)
}

/// Offsets of every start code as `(code_offset, payload_offset)`
fn start_codes(stream: &[u8]) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut i = 0;
    while i + 3 <= stream.len() {
        if stream[i..i + 3] == [0, 0, 1] {
            found.push((i, i + 3));
            i += 3;
        } else {
            i += 1;
        }
    }
    found
}

/// Split an Annex B byte stream (3- or 4-byte start codes)
pub fn extract_nalus_from_bytestream(stream: &[u8]) -> Vec<Nalu> {
    let codes = start_codes(stream);
    codes
        .iter()
        .enumerate()
        .filter_map(|(n, &(_, payload))| {
            let end = codes.get(n + 1).map(|&(next, _)| next).unwrap_or(stream.len());
            // A 4-byte code, or trailing_zero_bits, leaves zeros before the next code
            let unit = &stream[payload..end];
            let trimmed = unit.len() - unit.iter().rev().take_while(|&&b| b == 0).count();
            Nalu::new(unit[..trimmed].to_vec())
        })
        .collect()
}

/// Reframe a length-prefixed MP4 sample as Annex B for the decoder
pub fn sample_to_annexb(sample: &[u8]) -> Option<Vec<u8>> {
    let nalus = extract_nalus_from_sample(sample)?;
    let mut out = Vec::with_capacity(sample.len() + nalus.len() * START_CODE.len());
    for nalu in &nalus {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(&nalu.data);
    }
    Some(out)
}

/// An encoded access unit split into what an MP4 track needs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessUnit {
    pub sps: Option<Vec<u8>>,
    pub pps: Option<Vec<u8>>,
    /// Length-prefixed picture data, parameter sets and delimiters removed
    pub sample: Vec<u8>,
    pub is_sync: bool,
}

/// Split encoder output (Annex B) into parameter sets and an MP4 sample
pub fn annexb_to_access_unit(stream: &[u8]) -> AccessUnit {
    let mut unit = AccessUnit::default();
    for nalu in extract_nalus_from_bytestream(stream) {
        match nalu.nalu_type {
            NaluType::SPS => unit.sps = Some(nalu.data),
            NaluType::PPS => unit.pps = Some(nalu.data),
            NaluType::AUD => {}
            nalu_type => {
                unit.is_sync |= nalu_type == NaluType::IDR;
                unit.sample
                    .extend_from_slice(&(nalu.data.len() as u32).to_be_bytes());
                unit.sample.extend_from_slice(&nalu.data);
            }
        }
    }
    unit
}
