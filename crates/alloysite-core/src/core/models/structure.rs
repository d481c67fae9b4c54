use super::atom::{Atom, LayerTag};
use nalgebra::{Matrix3, Vector3};

/// An ordered collection of atoms inside a periodic cell.
///
/// The cell is stored row-wise: row `i` is the `i`-th lattice vector. Atom indices
/// are stable and are used as atom ids throughout the geometry code.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicStructure {
    atoms: Vec<Atom>,
    cell: Matrix3<f64>,
}

impl AtomicStructure {
    pub fn new(atoms: Vec<Atom>, cell: Matrix3<f64>) -> Self {
        Self { atoms, cell }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, id: usize) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn cell(&self) -> &Matrix3<f64> {
        &self.cell
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the ids of all atoms carrying `tag`, in ascending order.
    pub fn ids_with_tag(&self, tag: LayerTag) -> impl Iterator<Item = usize> + '_ {
        self.atoms
            .iter()
            .enumerate()
            .filter(move |(_, atom)| atom.tag == tag)
            .map(|(id, _)| id)
    }

    /// Euclidean distance between two atoms, without minimum-image wrapping.
    pub fn distance(&self, a: usize, b: usize) -> Option<f64> {
        let pa = self.atoms.get(a)?.position;
        let pb = self.atoms.get(b)?.position;
        Some((pb - pa).norm())
    }

    /// Replicates the structure `nx × ny × nz` times along the lattice vectors.
    ///
    /// Replicas are laid out replica-major: all atoms of replica `(i, j, k)` precede
    /// those of the next replica, with `k` varying fastest. The atom with index `a`
    /// in replica `(i, j, k)` therefore receives the id
    /// `((i * ny + j) * nz + k) * len + a`. The returned cell is scaled accordingly.
    pub fn repeat(&self, nx: usize, ny: usize, nz: usize) -> AtomicStructure {
        let a: Vector3<f64> = self.cell.row(0).transpose();
        let b: Vector3<f64> = self.cell.row(1).transpose();
        let c: Vector3<f64> = self.cell.row(2).transpose();

        let mut atoms = Vec::with_capacity(self.atoms.len() * nx * ny * nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    let shift = a * i as f64 + b * j as f64 + c * k as f64;
                    atoms.extend(self.atoms.iter().map(|atom| Atom {
                        symbol: atom.symbol.clone(),
                        position: atom.position + shift,
                        tag: atom.tag,
                    }));
                }
            }
        }

        let mut cell = self.cell;
        cell.row_mut(0).scale_mut(nx as f64);
        cell.row_mut(1).scale_mut(ny as f64);
        cell.row_mut(2).scale_mut(nz as f64);

        AtomicStructure { atoms, cell }
    }
}
