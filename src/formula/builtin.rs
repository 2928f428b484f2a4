//! Built-in formulas.

use super::{guarded_div, Formula, SpectrumCounts};

/// Ample: `|EF/(EF+NF) − EP/(EP+NP)|`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ample;

impl Formula for Ample {
    fn name(&self) -> &str {
        "Ample"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        let left = guarded_div(c.ef, c.ef + c.nf);
        let right = guarded_div(c.ep, c.ep + c.np);
        (left - right).abs()
    }
}

/// Arithmetic mean: `(2·EF·NP − 2·NF·EP) / ((EF+EP)(NP+NF) + (EF+NF)(EP+NP))`
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticMean;

impl Formula for ArithmeticMean {
    fn name(&self) -> &str {
        "ArithmeticMean"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        let numerator = 2.0 * c.ef * c.np - 2.0 * c.nf * c.ep;
        let denominator = (c.ef + c.ep) * (c.np + c.nf) + (c.ef + c.nf) * (c.ep + c.np);
        guarded_div(numerator, denominator)
    }
}

/// GP13 (genetic programming derived): `EF · (1 + 1/(2·EP+EF))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Gp13;

impl Formula for Gp13 {
    fn name(&self) -> &str {
        "GP13"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        if c.ef == 0.0 {
            return 0.0;
        }
        c.ef * (1.0 + 1.0 / (2.0 * c.ep + c.ef))
    }
}

/// Goodman: `(2EF − NF − EP) / (2EF + NF + EP)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Goodman;

impl Formula for Goodman {
    fn name(&self) -> &str {
        "Goodman"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        guarded_div(2.0 * c.ef - c.nf - c.ep, 2.0 * c.ef + c.nf + c.ep)
    }
}

/// Hamming: `EF + NP`
#[derive(Debug, Clone, Copy, Default)]
pub struct Hamming;

impl Formula for Hamming {
    fn name(&self) -> &str {
        "Hamming"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        c.ef + c.np
    }
}

/// M1: `(EF+NP) / (NF+EP)`
#[derive(Debug, Clone, Copy, Default)]
pub struct M1;

impl Formula for M1 {
    fn name(&self) -> &str {
        "M1"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        guarded_div(c.ef + c.np, c.nf + c.ep)
    }
}

/// Rogers & Tanimoto: `(EF+NP) / (EF+NP+2(NF+EP))`
#[derive(Debug, Clone, Copy, Default)]
pub struct RogersTanimoto;

impl Formula for RogersTanimoto {
    fn name(&self) -> &str {
        "RogersTanimoto"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        let numerator = c.ef + c.np;
        guarded_div(numerator, numerator + 2.0 * (c.nf + c.ep))
    }
}

/// Russell & Rao: `EF / (EF+NF+EP+NP)`
#[derive(Debug, Clone, Copy, Default)]
pub struct RussellRao;

impl Formula for RussellRao {
    fn name(&self) -> &str {
        "RussellRao"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        guarded_div(c.ef, c.total())
    }
}

/// Wong1: `EF`
#[derive(Debug, Clone, Copy, Default)]
pub struct Wong1;

impl Formula for Wong1 {
    fn name(&self) -> &str {
        "Wong1"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        c.ef
    }
}

/// Tarantula: `(EF/F) / (EF/F + EP/P)` with `F = EF+NF`, `P = EP+NP`
#[derive(Debug, Clone, Copy, Default)]
pub struct Tarantula;

impl Formula for Tarantula {
    fn name(&self) -> &str {
        "Tarantula"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        let fail_ratio = guarded_div(c.ef, c.ef + c.nf);
        let pass_ratio = guarded_div(c.ep, c.ep + c.np);
        if fail_ratio + pass_ratio > 0.0 {
            fail_ratio / (fail_ratio + pass_ratio)
        } else {
            0.0
        }
    }
}

/// Ochiai (cosine similarity): `EF / sqrt((EF+NF)(EF+EP))`
#[derive(Debug, Clone, Copy, Default)]
pub struct Ochiai;

impl Formula for Ochiai {
    fn name(&self) -> &str {
        "Ochiai"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        let denom = ((c.ef + c.nf) * (c.ef + c.ep)).sqrt();
        if denom > 0.0 {
            c.ef / denom
        } else {
            0.0
        }
    }
}

/// DStar with power 2: `EF² / (EP+NF)`
#[derive(Debug, Clone, Copy, Default)]
pub struct DStar2;

impl Formula for DStar2 {
    fn name(&self) -> &str {
        "DStar2"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        dstar(c, 2)
    }
}

/// DStar with power 3: `EF³ / (EP+NF)`
#[derive(Debug, Clone, Copy, Default)]
pub struct DStar3;

impl Formula for DStar3 {
    fn name(&self) -> &str {
        "DStar3"
    }

    fn suspiciousness(&self, c: &SpectrumCounts) -> f64 {
        dstar(c, 3)
    }
}

fn dstar(c: &SpectrumCounts, power: i32) -> f64 {
    let denom = c.ep + c.nf;
    if denom > 0.0 {
        c.ef.powi(power) / denom
    } else if c.ef > 0.0 {
        f64::MAX
    } else {
        0.0
    }
}
