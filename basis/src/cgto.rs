/* Contracted Cartesian Gaussians and NWChem basis-set parsing,
   built on the primitive functions in gto.rs.
*/

use crate::error::{BasisError, Result};
use crate::exponents::{cartesian_gtf_exponents, lmap};
use crate::gto::{Direction, GTO};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A fixed linear combination of primitives sharing `l_xyz` and center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractedGTO {
    pub primitives: Vec<GTO>,
    pub coefficients: Vec<f64>,
    // shell label plus Cartesian component, e.g. "d" with l_xyz (1, 1, 0)
    pub shell_type: String,
    pub l_xyz: Vector3<i32>,
}

impl ContractedGTO {
    pub fn new(
        shell_type: &str,
        l_xyz: Vector3<i32>,
        center: Vector3<f64>,
        exponents: &[f64],
        coefficients: &[f64],
    ) -> Self {
        let primitives = exponents
            .iter()
            .map(|&alpha| GTO::new(alpha, l_xyz, center))
            .collect();
        let mut cgto = ContractedGTO {
            primitives,
            coefficients: coefficients.to_vec(),
            shell_type: shell_type.to_string(),
            l_xyz,
        };
        cgto.normalize();
        cgto
    }

    pub fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        self.primitives
            .iter()
            .zip(&self.coefficients)
            .map(|(p, c)| c * p.evaluate(r))
            .sum()
    }

    pub fn derivative(&self, r: &Vector3<f64>, dir: Direction) -> f64 {
        self.primitives
            .iter()
            .zip(&self.coefficients)
            .map(|(p, c)| c * p.derivative(r, dir))
            .sum()
    }

    /// Overlap with itself; all primitives share one center so the
    /// one-dimensional factors have a closed form.
    pub fn self_overlap(&self) -> f64 {
        let mut s = 0.0;
        for (a, ca) in self.primitives.iter().zip(&self.coefficients) {
            for (b, cb) in self.primitives.iter().zip(&self.coefficients) {
                let p = a.alpha + b.alpha;
                let mut sab = a.norm * b.norm;
                for axis in 0..3 {
                    sab *= gaussian_moment(a.l_xyz[axis], p);
                }
                s += ca * cb * sab;
            }
        }
        s
    }

    fn normalize(&mut self) {
        let s = self.self_overlap();
        if s > 0.0 {
            let scale = 1.0 / s.sqrt();
            self.coefficients.iter_mut().for_each(|c| *c *= scale);
        }
    }
}

// integral of x^(2l) exp(-p x^2) over the real line
fn gaussian_moment(l: i32, p: f64) -> f64 {
    let double_factorial: f64 = (1..=(2 * l - 1)).step_by(2).map(|k| k as f64).product();
    double_factorial / (2.0 * p).powi(l) * (std::f64::consts::PI / p).sqrt()
}

/// One shell of an element's basis, before it is placed on an atom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shell {
    pub shell_type: String,
    pub l: u32,
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl Shell {
    /// Expands to one contracted function per Cartesian component.
    pub fn place(&self, center: Vector3<f64>) -> Vec<ContractedGTO> {
        cartesian_gtf_exponents(self.l)
            .into_iter()
            .map(|l_xyz| {
                ContractedGTO::new(&self.shell_type, l_xyz, center, &self.exponents, &self.coefficients)
            })
            .collect()
    }
}

/// The basis set of a single element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementBasis {
    pub symbol: String,
    pub atomic_number: u32,
    pub shells: Vec<Shell>,
}

impl ElementBasis {
    // Example of nwchem format:
    // BASIS "ao basis" PRINT
    // #BASIS SET: (4s,1p) -> [2s,1p]
    // H    S
    //       0.1873113696E+02       0.3349460434E-01
    //       0.2825394365E+01       0.2347269535E+00
    //       0.6401216923E+00       0.8137573261E+00
    // H    S
    //       0.1612777588E+00       1.0000000
    // H    P
    //       1.1000000              1.0000000
    // END
    //
    // SP blocks carry an s and a p coefficient on each row.

    /// Parses a single-element basis in NWChem format.
    pub fn parse_nwchem(input: &str) -> Result<Self> {
        let mut symbol: Option<String> = None;
        let mut shells: Vec<Shell> = Vec::new();
        let mut current: Option<(String, Vec<Vec<f64>>)> = None;

        for (lineno, line) in input.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let upper = line.to_ascii_uppercase();
            if upper.starts_with("BASIS") {
                continue;
            }
            if upper == "END" {
                break;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens[0].chars().all(char::is_alphabetic) {
                if tokens.len() < 2 {
                    return Err(BasisError::Parse {
                        line: lineno + 1,
                        message: format!("expected '<element> <shell>', got '{}'", line),
                    });
                }
                match &symbol {
                    None => symbol = Some(tokens[0].to_string()),
                    Some(s) if !s.eq_ignore_ascii_case(tokens[0]) => {
                        return Err(BasisError::Parse {
                            line: lineno + 1,
                            message: format!("element {} inside the {} basis", tokens[0], s),
                        })
                    }
                    Some(_) => {}
                }
                if let Some((kind, rows)) = current.take() {
                    shells.extend(Self::build_shells(&kind, &rows)?);
                }
                current = Some((tokens[1].to_ascii_lowercase(), Vec::new()));
                continue;
            }

            let row = tokens
                .iter()
                .map(|t| t.replace(['D', 'd'], "E").parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| BasisError::Parse {
                    line: lineno + 1,
                    message: e.to_string(),
                })?;
            match current.as_mut() {
                Some((_, rows)) => rows.push(row),
                None => {
                    return Err(BasisError::Parse {
                        line: lineno + 1,
                        message: "primitive row before any shell header".to_string(),
                    })
                }
            }
        }

        if let Some((kind, rows)) = current.take() {
            shells.extend(Self::build_shells(&kind, &rows)?);
        }

        let symbol = symbol.ok_or_else(|| BasisError::Parse {
            line: 0,
            message: "no shells found".to_string(),
        })?;
        let element = periodic_table_on_an_enum::Element::from_symbol(&symbol)
            .ok_or_else(|| BasisError::UnknownElement(symbol.clone()))?;

        Ok(ElementBasis {
            symbol: element.get_symbol().to_string(),
            atomic_number: element.get_atomic_number() as u32,
            shells,
        })
    }

    fn build_shells(kind: &str, rows: &[Vec<f64>]) -> Result<Vec<Shell>> {
        // one column per shell letter after the exponent column
        let letters: Vec<String> = if kind == "sp" {
            vec!["s".to_string(), "p".to_string()]
        } else {
            vec![kind.to_string()]
        };

        let mut shells = Vec::with_capacity(letters.len());
        for (col, letter) in letters.iter().enumerate() {
            let l = lmap(letter).ok_or_else(|| BasisError::UnknownShell(kind.to_uppercase()))?;
            let mut exponents = Vec::with_capacity(rows.len());
            let mut coefficients = Vec::with_capacity(rows.len());
            for row in rows {
                if row.len() < col + 2 {
                    return Err(BasisError::Parse {
                        line: 0,
                        message: format!("{} shell row has {} columns", kind.to_uppercase(), row.len()),
                    });
                }
                exponents.push(row[0]);
                coefficients.push(row[col + 1]);
            }
            shells.push(Shell {
                shell_type: letter.clone(),
                l,
                exponents,
                coefficients,
            });
        }
        Ok(shells)
    }

    pub fn lmax(&self) -> u32 {
        self.shells.iter().map(|s| s.l).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::integrate_cube;

    const H_STO3G: &str = "
#  STO-3G  EMSL  Basis Set Exchange Library
BASIS \"ao basis\" PRINT
H    S
      3.42525091             0.15432897
      0.62391373             0.53532814
      0.16885540             0.44463454
END
";

    const C_SP: &str = "
C    S
    172.2560000              0.0617669
     25.9109000              0.3587940
      5.5333500              0.7007130
C    SP
      3.6649800             -0.3958970              0.2364600
      0.7705450              1.2158400              0.8606190
C    D
      0.8000000              1.0000000
END
";

    #[test]
    fn test_parse_single_s_shell() {
        let basis = ElementBasis::parse_nwchem(H_STO3G).unwrap();
        assert_eq!(basis.symbol, "H");
        assert_eq!(basis.atomic_number, 1);
        assert_eq!(basis.shells.len(), 1);
        assert_eq!(basis.shells[0].l, 0);
        assert_eq!(basis.shells[0].exponents.len(), 3);
    }

    #[test]
    fn test_parse_sp_and_d_shells() {
        let basis = ElementBasis::parse_nwchem(C_SP).unwrap();
        let kinds: Vec<u32> = basis.shells.iter().map(|s| s.l).collect();
        assert_eq!(kinds, vec![0, 0, 1, 2]);
        assert!((basis.shells[2].coefficients[1] - 0.8606190).abs() < 1e-12);
        assert_eq!(basis.lmax(), 2);

        let placed: usize = basis
            .shells
            .iter()
            .map(|s| s.place(Vector3::zeros()).len())
            .sum();
        assert_eq!(placed, 1 + 1 + 3 + 6);
    }

    #[test]
    fn test_parse_rejects_unknown_shell() {
        let bad = "H  Q\n 1.0 1.0\nEND\n";
        assert!(matches!(
            ElementBasis::parse_nwchem(bad),
            Err(BasisError::UnknownShell(_))
        ));
    }

    #[test]
    fn test_contracted_function_is_normalized() {
        let basis = ElementBasis::parse_nwchem(C_SP).unwrap();
        for shell in &basis.shells {
            for cgto in shell.place(Vector3::new(0.2, 0.0, -0.1)) {
                assert!((cgto.self_overlap() - 1.0).abs() < 1e-12);
            }
        }

        let s = &ElementBasis::parse_nwchem(H_STO3G).unwrap().shells[0].place(Vector3::zeros())[0];
        let integral = integrate_cube(|r| s.evaluate(r).powi(2), -7.0, 7.0, 90);
        assert!((integral - 1.0).abs() < 1e-4, "got {}", integral);
    }
}
