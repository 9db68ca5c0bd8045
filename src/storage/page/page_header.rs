//! Page type tag and checksum shared by every page of an index file.

/// What a page holds.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Never written, or unrecognized.
    #[default]
    Invalid = 0,
    /// Page 0: the index header.
    IndexHeader = 1,
    BTreeInternal = 2,
    BTreeLeaf = 3,
    /// Released by a merge or root collapse, waiting for reuse.
    Free = 4,
}

impl PageType {
    /// Decode a type tag; unknown tags map to `Invalid`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::IndexHeader,
            2 => PageType::BTreeInternal,
            3 => PageType::BTreeLeaf,
            4 => PageType::Free,
            _ => PageType::Invalid,
        }
    }
}

/// The first bytes of every page.
///
/// ```text
/// 0   page_type  u8
/// 1   checksum   u32 LE, CRC32 of the page with this field zeroed
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub checksum: u32,
}

impl PageHeader {
    pub const SIZE: usize = 5;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_CHECKSUM: usize = 1;

    const CHECKSUM_RANGE: std::ops::Range<usize> = Self::OFFSET_CHECKSUM..Self::OFFSET_CHECKSUM + 4;

    /// A header for a page about to be encoded; the checksum is filled in
    /// once the body is written.
    pub fn new(page_type: PageType) -> Self {
        Self {
            page_type,
            checksum: 0,
        }
    }

    /// # Panics
    /// Panics if `data` is shorter than [`PageHeader::SIZE`].
    pub fn from_bytes(data: &[u8]) -> Self {
        let checksum = data[Self::CHECKSUM_RANGE]
            .try_into()
            .map(u32::from_le_bytes)
            .unwrap_or_else(|_| unreachable!("checksum range is 4 bytes"));
        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            checksum,
        }
    }

    /// # Panics
    /// Panics if `data` is shorter than [`PageHeader::SIZE`].
    pub fn write_to(&self, data: &mut [u8]) {
        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::CHECKSUM_RANGE].copy_from_slice(&self.checksum.to_le_bytes());
    }

    /// CRC32 of a whole page, reading the checksum field as zeros.
    pub fn compute_checksum(page_data: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&page_data[..Self::OFFSET_CHECKSUM]);
        hasher.update(&[0u8; 4]);
        hasher.update(&page_data[Self::CHECKSUM_RANGE.end..]);
        hasher.finalize()
    }

    pub fn verify_checksum(&self, page_data: &[u8]) -> bool {
        self.checksum == Self::compute_checksum(page_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::PAGE_SIZE;

    #[test]
    fn test_type_tags() {
        for ty in [
            PageType::IndexHeader,
            PageType::BTreeInternal,
            PageType::BTreeLeaf,
            PageType::Free,
        ] {
            assert_eq!(PageType::from_u8(ty as u8), ty);
        }
        assert_eq!(PageType::from_u8(0), PageType::Invalid);
        assert_eq!(PageType::from_u8(77), PageType::Invalid);
    }

    #[test]
    fn test_header_bytes() {
        let header = PageHeader {
            page_type: PageType::Free,
            checksum: 0xA1B2C3D4,
        };
        let mut buffer = [0u8; 8];
        header.write_to(&mut buffer);

        assert_eq!(&buffer[..5], &[4, 0xD4, 0xC3, 0xB2, 0xA1]);
        assert_eq!(PageHeader::from_bytes(&buffer), header);
    }

    #[test]
    fn test_checksum_covers_body_not_itself() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = PageType::BTreeLeaf as u8;
        page[PAGE_SIZE - 1] = 9;
        let crc = PageHeader::compute_checksum(&page);

        page[PageHeader::CHECKSUM_RANGE].copy_from_slice(&crc.to_le_bytes());
        let header = PageHeader::from_bytes(&page);
        assert!(header.verify_checksum(&page));

        page[PAGE_SIZE - 1] = 8;
        assert!(!header.verify_checksum(&page));
    }
}
