use crate::error::{GeometryError, GeometryResult};
use crate::math::Position;

/// Where a path tesselator reads its input from.
pub trait PathSource {
    /// Number of paths.
    fn path_count(&self) -> usize;

    /// Append the points of path `index` to `out`.
    fn read_path(&self, index: usize, out: &mut Vec<[f32; 3]>) -> GeometryResult<()>;
}

/// Paths produced by an accessor over arbitrary data items.
pub struct AccessorPaths<'a, D, F> {
    data: &'a [D],
    accessor: F,
}

impl<'a, D, F> AccessorPaths<'a, D, F> {
    pub fn new<P>(data: &'a [D], accessor: F) -> Self
    where
        P: Position,
        F: Fn(&D) -> &[P],
    {
        Self { data, accessor }
    }
}

impl<D, P, F> PathSource for AccessorPaths<'_, D, F>
where
    P: Position,
    F: Fn(&D) -> &[P],
{
    fn path_count(&self) -> usize {
        self.data.len()
    }

    fn read_path(&self, index: usize, out: &mut Vec<[f32; 3]>) -> GeometryResult<()> {
        let datum = self.data.get(index).ok_or_else(|| {
            GeometryError::out_of_range("paths", index, 1, self.data.len())
        })?;
        out.extend((self.accessor)(datum).iter().map(|p| p.to_xyz()));
        Ok(())
    }
}

impl<P: Position> PathSource for [Vec<P>] {
    fn path_count(&self) -> usize {
        self.len()
    }

    fn read_path(&self, index: usize, out: &mut Vec<[f32; 3]>) -> GeometryResult<()> {
        let path = self
            .get(index)
            .ok_or_else(|| GeometryError::out_of_range("paths", index, 1, self.len()))?;
        out.extend(path.iter().map(|p| p.to_xyz()));
        Ok(())
    }
}

/// Pre-packed coordinates: every path's points laid out back to back.
///
/// Path `i` spans points `starts[i]..starts[i + 1]` (the last path runs to the
/// end of `coords`). No per-point accessor is involved.
#[derive(Debug, Clone, Copy)]
pub struct FlatPaths<'a> {
    coords: &'a [f32],
    size: usize,
    starts: &'a [usize],
}

impl<'a> FlatPaths<'a> {
    /// Wrap flat coordinates with `size` (2 or 3) components per point.
    pub fn new(coords: &'a [f32], size: usize, starts: &'a [usize]) -> GeometryResult<Self> {
        if size != 2 && size != 3 {
            return Err(GeometryError::invalid(format!(
                "flat path coordinates must have 2 or 3 components, got {size}"
            )));
        }
        if coords.len() % size != 0 {
            return Err(GeometryError::invalid(format!(
                "{} coordinates is not a whole number of {size}-component points",
                coords.len()
            )));
        }
        let points = coords.len() / size;
        if starts.windows(2).any(|w| w[0] > w[1]) || starts.last().is_some_and(|&s| s > points) {
            return Err(GeometryError::invalid(
                "flat path start indices must be non-decreasing and within the coordinates",
            ));
        }
        Ok(Self {
            coords,
            size,
            starts,
        })
    }

    /// Total number of points across all paths.
    pub fn point_count(&self) -> usize {
        self.coords.len() / self.size
    }
}

impl PathSource for FlatPaths<'_> {
    fn path_count(&self) -> usize {
        self.starts.len()
    }

    fn read_path(&self, index: usize, out: &mut Vec<[f32; 3]>) -> GeometryResult<()> {
        let start = *self
            .starts
            .get(index)
            .ok_or_else(|| GeometryError::out_of_range("paths", index, 1, self.starts.len()))?;
        let end = self
            .starts
            .get(index + 1)
            .copied()
            .unwrap_or_else(|| self.point_count());
        let coords = &self.coords[start * self.size..end * self.size];
        out.extend(coords.chunks_exact(self.size).map(|c| match *c {
            [x, y] => [x, y, 0.0],
            [x, y, z] => [x, y, z],
            _ => [0.0; 3],
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Trip {
        path: Vec<[f32; 2]>,
    }

    fn read_all(source: &(impl PathSource + ?Sized)) -> Vec<Vec<[f32; 3]>> {
        (0..source.path_count())
            .map(|i| {
                let mut out = Vec::new();
                source.read_path(i, &mut out).unwrap();
                out
            })
            .collect()
    }

    #[test]
    fn test_accessor_paths() {
        let trips = vec![
            Trip {
                path: vec![[0.0, 0.0], [1.0, 1.0]],
            },
            Trip { path: vec![] },
        ];
        let source = AccessorPaths::new(trips.as_slice(), |t: &Trip| t.path.as_slice());
        assert_eq!(
            read_all(&source),
            vec![vec![[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]], vec![]]
        );
        assert!(source.read_path(2, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_nested_vec_paths() {
        let paths = vec![vec![[1.0f32, 2.0, 3.0]]];
        assert_eq!(read_all(paths.as_slice()), vec![vec![[1.0, 2.0, 3.0]]]);
    }

    #[test]
    fn test_flat_paths() {
        let coords = [0.0, 0.0, 1.0, 0.0, 2.0, 0.0, 5.0, 5.0];
        let starts = [0, 3];
        let source = FlatPaths::new(&coords, 2, &starts).unwrap();
        assert_eq!(source.point_count(), 4);
        let paths = read_all(&source);
        assert_eq!(paths[0].len(), 3);
        assert_eq!(paths[1], vec![[5.0, 5.0, 0.0]]);
    }

    #[test]
    fn test_flat_paths_validation() {
        let coords = [0.0; 6];
        assert!(FlatPaths::new(&coords, 4, &[0]).is_err());
        assert!(FlatPaths::new(&coords[..5], 2, &[0]).is_err());
        assert!(FlatPaths::new(&coords, 3, &[1, 0]).is_err());
        assert!(FlatPaths::new(&coords, 3, &[0, 3]).is_err());
        assert!(FlatPaths::new(&coords, 3, &[0, 2]).is_ok());
    }
}
