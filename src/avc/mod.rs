pub mod nalus;

pub use nalus::{
    annexb_to_access_unit, extract_nalus_from_bytestream, extract_nalus_from_sample,
    sample_to_annexb, AccessUnit, Nalu, NaluType,
};
