//! Ascending priority sort for the due list.
//!
//! Lomuto-partition quicksort, last element as pivot — unchanged from the
//! reference scheduler. Implemented iteratively with an explicit bound
//! stack instead of recursion, so sorting never grows the call stack
//! regardless of input order, matching this crate's no-heap, bounded-stack
//! posture.

use crate::config::MAX_TASK_SIZE;
use crate::task::DueEntry;

fn partition(arr: &mut [DueEntry], low: usize, high: usize) -> usize {
    let pivot = arr[high].priority;
    let mut i = low;
    for j in low..high {
        if arr[j].priority <= pivot {
            arr.swap(i, j);
            i += 1;
        }
    }
    arr.swap(i, high);
    i
}

/// Sorts `arr[0..len]` ascending by priority.
pub fn sort_ascending(arr: &mut [DueEntry], len: usize) {
    if len < 2 {
        return;
    }
    let mut stack = [(0usize, 0usize); MAX_TASK_SIZE];
    let mut top = 0usize;
    stack[top] = (0, len - 1);
    top += 1;

    while top > 0 {
        top -= 1;
        let (low, high) = stack[top];
        if low >= high {
            continue;
        }
        let pi = partition(arr, low, high);
        if pi > low {
            stack[top] = (low, pi - 1);
            top += 1;
        }
        if pi + 1 < high {
            stack[top] = (pi + 1, high);
            top += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(priorities: &[u8]) -> ([DueEntry; MAX_TASK_SIZE], usize) {
        let mut arr = [DueEntry::default(); MAX_TASK_SIZE];
        for (i, &p) in priorities.iter().enumerate() {
            arr[i] = DueEntry { task_id: i as u8, priority: p };
        }
        (arr, priorities.len())
    }

    #[test]
    fn sorts_ascending_by_priority() {
        let (mut arr, len) = entries(&[5, 1, 4, 2, 8, 0]);
        sort_ascending(&mut arr, len);
        let expected = [0u8, 1, 2, 4, 5, 8];
        for i in 0..len {
            assert_eq!(arr[i].priority, expected[i]);
        }
    }

    #[test]
    fn single_and_empty_are_no_ops() {
        let mut one = [DueEntry { task_id: 0, priority: 9 }];
        sort_ascending(&mut one, 1);
        assert_eq!(one[0].priority, 9);

        let mut empty: [DueEntry; 0] = [];
        sort_ascending(&mut empty, 0);
    }

    #[test]
    fn stable_enough_for_all_equal_priorities() {
        let (mut arr, len) = entries(&[3, 3, 3, 3]);
        sort_ascending(&mut arr, len);
        assert!(arr[..len].iter().all(|e| e.priority == 3));
    }
}
