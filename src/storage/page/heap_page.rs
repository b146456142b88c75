use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

/// Heap page layout:
///
/// +--------------------+
/// | Occupancy Bitmap   |  ceil(N/8) bytes, bit i = slot i occupied
/// +--------------------+
/// | Slot 0             |  desc.size() bytes each
/// | Slot 1             |
/// | ...                |
/// | Slot N-1           |
/// +--------------------+
/// | Zero Padding       |  up to the page size
/// +--------------------+
///
/// N = floor(page_size * 8 / (desc.size() * 8 + 1)): each slot costs its
/// tuple width in bits plus one bitmap bit. Bitmap bits are LSB-first
/// within each byte.
pub struct HeapPage {
    pid: PageId,
    desc: TupleDesc,
    page_size: usize,
    bitmap: Vec<u8>,
    slots: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
}

impl HeapPage {
    /// Returns the number of tuple slots a page of the given size holds
    /// for the given schema.
    pub fn slot_count(page_size: usize, desc: &TupleDesc) -> usize {
        (page_size * 8) / (desc.size() * 8 + 1)
    }

    /// Returns the size of the occupancy bitmap in bytes.
    fn header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    /// Returns a zeroed page image of the given size.
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    /// Parses a page from its on-disk image. The bitmap is read from the
    /// header and every occupied slot is deserialized eagerly; the page
    /// then owns the in-memory representation until it is written back.
    ///
    /// Fails with `Corrupt` if `data` is not exactly `page_size` bytes.
    pub fn new(pid: PageId, data: &[u8], desc: TupleDesc, page_size: usize) -> Result<Self> {
        if data.len() != page_size {
            return Err(DbError::Corrupt(format!(
                "page buffer is {} bytes, expected {}",
                data.len(),
                page_size
            )));
        }

        let slot_count = Self::slot_count(page_size, &desc);
        let header_size = Self::header_size(slot_count);
        let bitmap = data[..header_size].to_vec();
        let tuple_size = desc.size();

        let mut slots = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            if bitmap[i / 8] & (1 << (i % 8)) != 0 {
                let offset = header_size + i * tuple_size;
                let mut tuple = Tuple::from_bytes(&desc, &data[offset..offset + tuple_size])?;
                tuple.set_record_id(Some(RecordId::new(pid, SlotId::new(i as u16))));
                slots.push(Some(tuple));
            } else {
                slots.push(None);
            }
        }

        Ok(Self {
            pid,
            desc,
            page_size,
            bitmap,
            slots,
            dirtier: None,
        })
    }

    pub fn id(&self) -> PageId {
        self.pid
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Returns the number of unoccupied slots, i.e. the count of zero
    /// bits in the valid bitmap range.
    pub fn num_empty_slots(&self) -> usize {
        (0..self.slots.len())
            .filter(|&i| !self.slot_bit(i))
            .count()
    }

    /// Returns whether the given slot currently holds a tuple.
    pub fn is_slot_used(&self, slot: SlotId) -> bool {
        slot.as_usize() < self.slots.len() && self.slot_bit(slot.as_usize())
    }

    fn slot_bit(&self, i: usize) -> bool {
        self.bitmap[i / 8] & (1 << (i % 8)) != 0
    }

    fn set_slot_bit(&mut self, i: usize, used: bool) {
        if used {
            self.bitmap[i / 8] |= 1 << (i % 8);
        } else {
            self.bitmap[i / 8] &= !(1 << (i % 8));
        }
    }

    /// Returns the tuple in the given slot, or None if the slot is empty
    /// or out of range.
    pub fn tuple(&self, slot: SlotId) -> Option<&Tuple> {
        self.slots.get(slot.as_usize()).and_then(|s| s.as_ref())
    }

    /// Inserts a tuple into the lowest empty slot and stamps its record
    /// id. Fails with `SchemaMismatch` if the tuple's descriptor differs
    /// from the table's, and `PageFull` if every slot is occupied.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId> {
        if tuple.desc() != &self.desc {
            return Err(DbError::SchemaMismatch);
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(DbError::PageFull(self.pid))?;

        let rid = RecordId::new(self.pid, SlotId::new(slot as u16));
        tuple.set_record_id(Some(rid));
        self.set_slot_bit(slot, true);
        self.slots[slot] = Some(tuple);
        Ok(rid)
    }

    /// Removes the tuple from its slot. Fails if the tuple carries no
    /// record id, names a different page, or its slot is already empty.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if rid.page_id() != self.pid {
            return Err(DbError::NotOnPage(self.pid));
        }

        let slot = rid.slot_id();
        if !self.is_slot_used(slot) {
            return Err(DbError::SlotAlreadyEmpty(slot.as_u16()));
        }

        self.set_slot_bit(slot.as_usize(), false);
        self.slots[slot.as_usize()] = None;
        Ok(())
    }

    /// Iterates the occupied slots in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Records which transaction dirtied the page, or clears the mark.
    pub fn mark_dirty(&mut self, tid: Option<TransactionId>) {
        self.dirtier = tid;
    }

    /// Returns the transaction that last dirtied this page, or None if
    /// the page is clean.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Serializes the page for write-through: bitmap, then every slot
    /// (zeros where empty), then zero padding to the page size.
    pub fn page_data(&self) -> Vec<u8> {
        let tuple_size = self.desc.size();
        let mut data = Vec::with_capacity(self.page_size);
        data.extend_from_slice(&self.bitmap);

        for slot in &self.slots {
            match slot {
                Some(tuple) => data.extend_from_slice(&tuple.to_bytes()),
                None => data.extend(std::iter::repeat(0u8).take(tuple_size)),
            }
        }

        data.resize(self.page_size, 0);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PAGE_SIZE;
    use crate::tuple::{Field, FieldType};

    fn int_desc() -> TupleDesc {
        TupleDesc::with_names(&[FieldType::Int, FieldType::Int], &["a", "b"])
    }

    fn int_tuple(desc: &TupleDesc, a: i32, b: i32) -> Tuple {
        Tuple::new(desc.clone(), vec![Field::Int(a), Field::Int(b)])
    }

    fn empty_page(desc: &TupleDesc) -> HeapPage {
        let pid = PageId::new(1, 0);
        HeapPage::new(pid, &HeapPage::empty_page_data(PAGE_SIZE), desc.clone(), PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_slot_count() {
        // 8-byte tuples: floor(4096 * 8 / 65) slots
        let desc = int_desc();
        let slots = HeapPage::slot_count(PAGE_SIZE, &desc);
        assert_eq!(slots, PAGE_SIZE * 8 / (desc.size() * 8 + 1));
        // header plus slot bytes must fit in the page
        assert!(HeapPage::header_size(slots) + slots * desc.size() <= PAGE_SIZE);
    }

    #[test]
    fn test_wrong_buffer_length_is_corrupt() {
        let result = HeapPage::new(
            PageId::new(1, 0),
            &vec![0u8; PAGE_SIZE - 1],
            int_desc(),
            PAGE_SIZE,
        );
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn test_insert_stamps_record_id() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        let before = page.num_empty_slots();

        let rid = page.insert_tuple(int_tuple(&desc, 1, 2)).unwrap();
        assert_eq!(rid, RecordId::new(page.id(), SlotId::new(0)));
        assert_eq!(page.num_empty_slots(), before - 1);

        let stored = page.tuple(SlotId::new(0)).unwrap();
        assert_eq!(stored.record_id(), Some(rid));
        assert_eq!(stored.field(0), Some(&Field::Int(1)));
    }

    #[test]
    fn test_insert_reuses_lowest_empty_slot() {
        let desc = int_desc();
        let mut page = empty_page(&desc);

        let first = page.insert_tuple(int_tuple(&desc, 1, 1)).unwrap();
        page.insert_tuple(int_tuple(&desc, 2, 2)).unwrap();

        let victim = page.tuple(first.slot_id()).unwrap().clone();
        page.delete_tuple(&victim).unwrap();

        let rid = page.insert_tuple(int_tuple(&desc, 3, 3)).unwrap();
        assert_eq!(rid.slot_id(), first.slot_id());
    }

    #[test]
    fn test_schema_mismatch() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        let other = TupleDesc::with_types(&[FieldType::Int]);
        let tuple = Tuple::new(other, vec![Field::Int(1)]);
        assert!(matches!(
            page.insert_tuple(tuple),
            Err(DbError::SchemaMismatch)
        ));
    }

    #[test]
    fn test_page_full() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        let slots = page.num_empty_slots();
        for i in 0..slots {
            page.insert_tuple(int_tuple(&desc, i as i32, 0)).unwrap();
        }
        assert_eq!(page.num_empty_slots(), 0);
        assert!(matches!(
            page.insert_tuple(int_tuple(&desc, -1, -1)),
            Err(DbError::PageFull(_))
        ));
    }

    #[test]
    fn test_double_delete_fails() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        page.insert_tuple(int_tuple(&desc, 1, 2)).unwrap();

        let stored = page.tuple(SlotId::new(0)).unwrap().clone();
        page.delete_tuple(&stored).unwrap();
        assert!(matches!(
            page.delete_tuple(&stored),
            Err(DbError::SlotAlreadyEmpty(0))
        ));
    }

    #[test]
    fn test_delete_wrong_page_fails() {
        let desc = int_desc();
        let mut page = empty_page(&desc);

        let mut foreign = int_tuple(&desc, 1, 2);
        foreign.set_record_id(Some(RecordId::new(PageId::new(9, 9), SlotId::new(0))));
        assert!(matches!(
            page.delete_tuple(&foreign),
            Err(DbError::NotOnPage(_))
        ));

        let unstamped = int_tuple(&desc, 1, 2);
        assert!(matches!(
            page.delete_tuple(&unstamped),
            Err(DbError::MissingRecordId)
        ));
    }

    #[test]
    fn test_iter_ascending_slot_order() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        for v in [10, 20, 30] {
            page.insert_tuple(int_tuple(&desc, v, 0)).unwrap();
        }

        let values: Vec<i32> = page
            .iter()
            .map(|t| match t.field(0) {
                Some(Field::Int(v)) => *v,
                _ => panic!("expected int field"),
            })
            .collect();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_serialization_roundtrip_is_byte_exact() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        for v in 0..5 {
            page.insert_tuple(int_tuple(&desc, v, v * 2)).unwrap();
        }
        // punch a hole so the bitmap is not contiguous
        let second = page.tuple(SlotId::new(1)).unwrap().clone();
        page.delete_tuple(&second).unwrap();

        let data = page.page_data();
        assert_eq!(data.len(), PAGE_SIZE);

        let reparsed = HeapPage::new(page.id(), &data, desc, PAGE_SIZE).unwrap();
        assert_eq!(reparsed.page_data(), data);
        assert_eq!(reparsed.num_empty_slots(), page.num_empty_slots());
        assert!(!reparsed.is_slot_used(SlotId::new(1)));
    }

    #[test]
    fn test_dirty_tracking() {
        let desc = int_desc();
        let mut page = empty_page(&desc);
        assert_eq!(page.dirtier(), None);

        let tid = TransactionId::new();
        page.mark_dirty(Some(tid));
        assert_eq!(page.dirtier(), Some(tid));

        page.mark_dirty(None);
        assert_eq!(page.dirtier(), None);
    }
}
