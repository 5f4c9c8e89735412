//! Householder QR Demonstration
//!
//! Factors a random matrix with elementary reflectors, then rebuilds the
//! orthogonal factor both out of place and in place from the compact
//! storage.

use simdexpr::householder::apply_householder_on_the_left;
use simdexpr::prelude::*;
use simdexpr::Result;

/// Compact QR: reflectors below the diagonal, `R` on and above it.
fn householder_qr(a: &Matrix<f64>) -> Result<(Matrix<f64>, Matrix<f64>)> {
    let (rows, cols) = a.shape();
    let steps = rows.min(cols);
    let mut qr = a.clone();
    let mut taus = Matrix::<f64>::zeros(steps, 1);
    for k in 0..steps {
        let reflector = make_householder(&(&qr).block(k, k, rows - k, 1))?;
        if k + 1 < cols {
            let mut trailing = qr.block_mut(k, k + 1, rows - k, cols - k - 1);
            apply_householder_on_the_left(&mut trailing, &reflector.essential, reflector.tau)?;
        }
        qr[(k, k)] = reflector.beta;
        for i in 0..reflector.essential.rows() {
            qr[(k + 1 + i, k)] = reflector.essential[(i, 0)];
        }
        taus[(k, 0)] = reflector.tau;
    }
    Ok((qr, taus))
}

fn run() -> Result<()> {
    let n = 6;
    let a = Matrix::<f64>::random(n, n);
    let (qr, taus) = householder_qr(&a)?;

    let q = HouseholderSequence::new(&qr, &taus).eval()?;
    let r = Matrix::<f64>::from_fn(n, n, |i, j| if i <= j { qr[(i, j)] } else { 0.0 });

    let rebuilt = q.product(&r)?;
    println!("||Q R - A||     = {:.3e}", (&rebuilt).minus(&a).norm());

    let gram = (&q).transpose().product(&q)?;
    println!("||Q^T Q - I||   = {:.3e}", (&gram).minus(&Matrix::<f64>::identity(n)).norm());

    let mut in_place = qr.clone();
    HouseholderSequence::eval_in_place(&mut in_place, &taus, 0)?;
    println!("||Q_inplace - Q|| = {:.3e}", (&in_place).minus(&q).norm());

    let mut projected = a.clone();
    HouseholderSequence::new(&qr, &taus)
        .adjoint()
        .apply_on_the_left(&mut projected)?;
    println!("||Q^T A - R||   = {:.3e}", (&projected).minus(&r).norm());
    Ok(())
}

fn main() {
    println!("Householder QR of a random 6x6 matrix\n");
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
