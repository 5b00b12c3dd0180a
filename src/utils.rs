use std::error::Error;

/// Boxed static error type
pub type Err = Box<dyn Error + 'static>;

/// Intersects two ascending, duplicate-free slices, keeping ascending order.
///
/// ```
/// use pcfg_cyk::utils::intersect_sorted;
///
/// assert_eq!(intersect_sorted(&[1, 3, 4, 7, 9], &[2, 3, 7, 8, 9]), vec![3, 7, 9]);
/// assert!(intersect_sorted::<usize>(&[], &[1, 2]).is_empty());
/// ```
pub fn intersect_sorted<T>(a: &[T], b: &[T]) -> Vec<T>
where
  T: Ord + Copy,
{
  let mut out = Vec::new();
  let (mut i, mut j) = (0, 0);
  while i < a.len() && j < b.len() {
    match a[i].cmp(&b[j]) {
      std::cmp::Ordering::Less => i += 1,
      std::cmp::Ordering::Greater => j += 1,
      std::cmp::Ordering::Equal => {
        out.push(a[i]);
        i += 1;
        j += 1;
      }
    }
  }
  out
}
