//! Ray-parallel iteration over row-major grids.
//! Runs on rayon with the `threading` feature, sequentially otherwise; the
//! result is identical either way because rows never share state.

#[cfg(feature = "threading")]
use rayon::prelude::*;

/// Call `f(ray, row)` for every `gates`-long row of `data`.
pub(crate) fn for_each_row_mut<T, F>(data: &mut [T], gates: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if gates == 0 {
        return;
    }

    #[cfg(feature = "threading")]
    data.par_chunks_mut(gates)
        .enumerate()
        .for_each(|(ray, row)| f(ray, row));

    #[cfg(not(feature = "threading"))]
    data.chunks_mut(gates)
        .enumerate()
        .for_each(|(ray, row)| f(ray, row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visits_every_row_once() {
        let mut data = vec![0usize; 12];
        for_each_row_mut(&mut data, 4, |ray, row| {
            for v in row.iter_mut() {
                *v += ray + 1;
            }
        });
        assert_eq!(data, vec![1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn zero_width_grid_is_a_no_op() {
        let mut data: Vec<u8> = Vec::new();
        for_each_row_mut(&mut data, 0, |_, _| panic!("no rows expected"));
    }
}
