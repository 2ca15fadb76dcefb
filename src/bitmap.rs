use roaring::RoaringBitmap;

pub type BatchSet = RoaringBitmap;
pub type BatchId = u32;
