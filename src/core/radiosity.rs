use crate::core::geometry::OrderedPVArray;
use crate::errors::PvError;
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Solve for the irradiance incident on every surface of the array once light has been
/// reflected between them, and write it back onto the surfaces.
///
/// Each surface must already carry its reflectivity `rho` and the parameters named in
/// `source_components`. `vf_matrix` holds the view factors between the surfaces with the sky as
/// the last index, and `sky_luminance` is the isotropic luminance of the sky in W/m2.
///
/// Adds to every surface:
/// - `isotropic`: diffuse light arriving straight from the sky
/// - `reflection`: light arriving after reflection from other surfaces
/// - `q0`: light leaving the surface
/// - `qinc`: total incident irradiance
pub fn solve_radiosity(
    pvarray: &mut OrderedPVArray,
    vf_matrix: &DMatrix<f64>,
    sky_luminance: f64,
    source_components: &[&str],
) -> Result<(), PvError> {
    let n_surfaces = pvarray.n_surfaces();
    if vf_matrix.shape() != (n_surfaces + 1, n_surfaces + 1) {
        return Err(PvError::InvalidGeometry(format!(
            "view factor matrix of shape {:?} does not match {n_surfaces} surfaces and the sky",
            vf_matrix.shape()
        )));
    }

    let mut rho = Vec::with_capacity(n_surfaces);
    let mut source = Vec::with_capacity(n_surfaces);
    for surface in pvarray.surfaces() {
        rho.push(surface.get_param("rho")?);
        source.push(
            source_components
                .iter()
                .map(|name| surface.get_param(name))
                .sum::<Result<f64, PvError>>()?,
        );
    }

    let qinc = solve_incident_irradiance(vf_matrix, &rho, &source, sky_luminance)?;

    for (i, surface) in pvarray.surfaces_mut().enumerate() {
        let isotropic = vf_matrix[(i, n_surfaces)] * sky_luminance;
        surface.set_param("isotropic", isotropic);
        surface.set_param("reflection", qinc[i] - source[i] - isotropic);
        surface.set_param("q0", rho[i] * qinc[i]);
        surface.set_param("qinc", qinc[i]);
    }
    Ok(())
}

/// Incident irradiance q of every surface, from q = b + F.R.q with b the light arriving straight
/// from the sky, F the view factors between surfaces and R the diagonal of reflectivities.
/// The last column of `vf_matrix` is the view factor to the sky.
pub(crate) fn solve_incident_irradiance(
    vf_matrix: &DMatrix<f64>,
    rho: &[f64],
    source: &[f64],
    sky_luminance: f64,
) -> Result<DVector<f64>, PvError> {
    let n_surfaces = rho.len();
    let sky_index = n_surfaces;

    if let Some((index, value)) = rho
        .iter()
        .enumerate()
        .find(|(_, value)| !(0. ..1.).contains(*value))
    {
        return Err(PvError::InvalidReflectivity {
            index,
            value: *value,
        });
    }

    // A = I - F.R
    let matrix_a = DMatrix::from_fn(n_surfaces, n_surfaces, |i, j| {
        let identity = if i == j { 1. } else { 0. };
        identity - vf_matrix[(i, j)] * rho[j]
    });
    let vector_b = DVector::from_fn(n_surfaces, |i, _| {
        source[i] + vf_matrix[(i, sky_index)] * sky_luminance
    });

    // use LU solver with partial pivoting
    let qinc = matrix_a
        .lu()
        .solve(&vector_b)
        .ok_or(PvError::SingularRadiositySystem)?;
    if qinc.iter().any(|value| !value.is_finite()) {
        return Err(PvError::SingularRadiositySystem);
    }

    trace!("Solved radiosity for {n_surfaces} surfaces");
    Ok(qinc)
}
