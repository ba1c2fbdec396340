//! Houdini `PGEOMETRY` export of the finest-depth triangle mesh, a
//! direct port of `manifold_save_geo`.

use crate::manifold::SphericalManifold;
use std::io::Write;
use wavetree_core::{io_failure, Result};

/// Write the finest-depth triangle mesh as a Houdini `PGEOMETRY V5`
/// ASCII file.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_geo<W: Write>(manifold: &SphericalManifold, out: &mut W) -> Result<()> {
    let degree = manifold.degree();
    let vertices = manifold.vertices();
    let triangles = manifold.triangles_at(degree);
    tracing::debug!(
        degree,
        nvertices = vertices.len(),
        ntriangles = triangles.len(),
        "writing PGEOMETRY mesh"
    );

    writeln!(out, "PGEOMETRY V5")
        .map_err(|e| io_failure("writing geo header", e))?;
    writeln!(out, "NPoints {} NPrims {}", vertices.len(), triangles.len())
        .map_err(|e| io_failure("writing geo counts", e))?;
    writeln!(out, "NPointGroups 0 NPrimGroups 0")
        .map_err(|e| io_failure("writing geo group counts", e))?;
    writeln!(out, "NPointAttrib 0 NVertexAttrib 0 NPrimAttrib 0 NAttrib 0")
        .map_err(|e| io_failure("writing geo attrib counts", e))?;

    for v in vertices {
        writeln!(out, "{} {} {} 1", v.pos.x, v.pos.y, v.pos.z)
            .map_err(|e| io_failure("writing geo point", e))?;
    }

    writeln!(out, "Run {} Poly", triangles.len())
        .map_err(|e| io_failure("writing geo run header", e))?;
    for t in triangles {
        writeln!(out, " 3 < {} {} {}", t.a, t.b, t.c)
            .map_err(|e| io_failure("writing geo triangle", e))?;
    }

    writeln!(out, "beginExtra")
        .map_err(|e| io_failure("writing geo extra", e))?;
    writeln!(out, "endExtra").map_err(|e| io_failure("writing geo extra", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::SphericalManifold;

    #[test]
    fn writes_expected_header_and_counts() {
        let m = SphericalManifold::new(1).expect("manifold builds");
        let mut buf = Vec::new();
        write_geo(&m, &mut buf).expect("geo export succeeds");
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("PGEOMETRY V5\n"));
        assert!(text.contains(&format!("NPoints {} NPrims {}", m.vertex_count(), m.triangles_at(m.degree()).len())));
    }
}
