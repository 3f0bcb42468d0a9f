// Allocation failure handling.
//
// A global allocator that refuses every request made by the current thread
// while `refusing` is active. Other test threads allocate normally.
//
// Property 1: initialize reports AllocationFailed, leaves the table in
//             InitFailed, and a later initialize succeeds.
// Property 2: add_or_update reports AllocationFailed when the key copy cannot
//             be allocated; the value comes back and the table is unchanged.
// Property 3: the same holds when the entry arena itself must grow.
// Property 4: updating an existing key needs no allocation and still works.
use keyed_table::{KeyedTable, TableError, TableStatus, Upsert};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

thread_local! {
    static REFUSE: Cell<bool> = const { Cell::new(false) };
}

struct RefusingAlloc;

unsafe impl GlobalAlloc for RefusingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if REFUSE.try_with(Cell::get).unwrap_or(false) {
            return std::ptr::null_mut();
        }
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if REFUSE.try_with(Cell::get).unwrap_or(false) {
            return std::ptr::null_mut();
        }
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static ALLOC: RefusingAlloc = RefusingAlloc;

fn refusing<R>(f: impl FnOnce() -> R) -> R {
    REFUSE.with(|r| r.set(true));
    let out = f();
    REFUSE.with(|r| r.set(false));
    out
}

#[test]
fn initialize_failure_is_reported_and_retryable() {
    let mut t: KeyedTable<u32> = KeyedTable::new();
    let res = refusing(|| t.initialize(64));
    assert_eq!(res, Err(TableError::AllocationFailed));
    assert_eq!(t.status(), TableStatus::InitFailed);
    assert_eq!(t.get("k"), None);
    assert_eq!(t.delete("k"), Err(TableError::NotInitialized));

    t.initialize(64).expect("retry succeeds");
    assert_eq!(t.status(), TableStatus::Ready);
    assert!(t.add_or_update("k", 1).unwrap().is_added());
}

#[test]
fn key_copy_failure_returns_value_and_leaves_table_unchanged() {
    let mut t: KeyedTable<Box<u32>> = KeyedTable::with_capacity(4).unwrap();
    t.add_or_update("a", Box::new(1)).unwrap();
    t.add_or_update("b", Box::new(2)).unwrap();
    let value = Box::new(7);
    let addr = &*value as *const u32;

    let res = refusing(|| t.add_or_update("fresh-key", value));
    let rejected = match res {
        Err(r) => r,
        Ok(other) => panic!("unexpected result: {:?}", other),
    };
    assert_eq!(rejected.error, TableError::AllocationFailed);
    let back = rejected.into_value();
    assert_eq!(&*back as *const u32, addr);

    assert_eq!(t.len(), 2);
    assert_eq!(t.get("fresh-key"), None);
    assert_eq!(t.get("a").map(|v| **v), Some(1));
    assert_eq!(t.get("b").map(|v| **v), Some(2));

    // The same insert succeeds once memory is available again.
    assert!(t.add_or_update("fresh-key", back).unwrap().is_added());
    assert_eq!(t.len(), 3);
}

#[test]
fn arena_growth_failure_returns_value_and_leaves_table_unchanged() {
    // The empty key needs no key copy, so under refusal only arena growth can
    // fail. Fill the table until the arena has no spare slot left.
    let mut t: KeyedTable<u64> = KeyedTable::with_capacity(4).unwrap();
    let mut n = 0u64;
    let rejected = loop {
        t.add_or_update(&format!("k{n}"), n).unwrap();
        n += 1;
        match refusing(|| t.add_or_update("", u64::MAX)) {
            Ok(Upsert::Added) => {
                assert_eq!(t.remove(""), Some(u64::MAX));
            }
            Ok(other) => panic!("unexpected result: {:?}", other),
            Err(r) => break r,
        }
        assert!(n < 100_000, "arena never needed to grow");
    };

    assert_eq!(rejected.error, TableError::AllocationFailed);
    assert_eq!(rejected.value, u64::MAX);
    assert_eq!(t.len() as u64, n);
    assert_eq!(t.get(""), None);
    for i in 0..n {
        assert_eq!(t.get(&format!("k{i}")), Some(&i));
    }

    assert!(t.add_or_update("", u64::MAX).unwrap().is_added());
    assert_eq!(t.len() as u64, n + 1);
}

#[test]
fn update_needs_no_allocation() {
    let mut t: KeyedTable<u8> = KeyedTable::with_capacity(2).unwrap();
    t.add_or_update("k", 1).unwrap();
    let res = refusing(|| t.add_or_update("k", 2));
    assert_eq!(res.unwrap().previous(), Some(1));
    assert_eq!(t.get("k"), Some(&2));
}
