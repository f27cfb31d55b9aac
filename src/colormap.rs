use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Viridis,
    Ylgn,
}

const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

const YLGN: [(u8, u8, u8); 9] = [
    (255, 255, 229),
    (247, 252, 185),
    (217, 240, 163),
    (173, 221, 142),
    (120, 198, 121),
    (65, 171, 93),
    (35, 132, 67),
    (0, 104, 55),
    (0, 69, 41),
];

impl Palette {
    fn anchors(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::Viridis => &VIRIDIS,
            Palette::Ylgn => &YLGN,
        }
    }

    pub fn at(self, t: f64) -> Rgb {
        let c = self.anchors();
        let t = t.clamp(0.0, 1.0);
        let x = t * (c.len() - 1) as f64;
        let i = x.floor() as usize;
        if i >= c.len() - 1 {
            let (r, g, b) = c[c.len() - 1];
            return Rgb(r, g, b);
        }
        let f = x - i as f64;
        let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
        let (r0, g0, b0) = c[i];
        let (r1, g1, b1) = c[i + 1];
        Rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }

    pub fn sample(self, n: usize) -> Vec<Rgb> {
        match n {
            0 => Vec::new(),
            1 => vec![self.at(0.5)],
            _ => (0..n).map(|i| self.at(i as f64 / (n - 1) as f64)).collect(),
        }
    }
}

/// A color scale with one color per bin; `index` holds the `colors.len() + 1`
/// bin edges in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepColormap {
    pub colors: Vec<Rgb>,
    pub index: Vec<f64>,
    pub caption: String,
}

impl StepColormap {
    pub fn from_values<I>(palette: Palette, bins: usize, values: I, caption: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let caption = caption.into();
        if bins == 0 {
            return Err(anyhow!("Color scale '{}' needs at least one bin", caption));
        }

        let (mut lo, mut hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if lo > hi {
            // Nothing to bin; the scale still needs edges for the legend.
            lo = 0.0;
            hi = 1.0;
        } else if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let step = (hi - lo) / bins as f64;
        let mut index: Vec<f64> = (0..bins).map(|i| lo + step * i as f64).collect();
        index.push(hi);

        Ok(Self {
            colors: palette.sample(bins),
            index,
            caption,
        })
    }

    pub fn vmin(&self) -> f64 {
        self.index[0]
    }

    pub fn vmax(&self) -> f64 {
        self.index[self.index.len() - 1]
    }

    pub fn color_for(&self, value: f64) -> Rgb {
        let last = self.colors.len() - 1;
        let bin = self.index[1..self.index.len() - 1]
            .iter()
            .position(|edge| value < *edge)
            .unwrap_or(last);
        self.colors[bin]
    }

    pub fn tick_labels(&self) -> Vec<String> {
        let integral = self.index.iter().all(|v| (v - v.round()).abs() < 1e-9);
        self.index
            .iter()
            .map(|v| if integral { format!("{:.0}", v) } else { format!("{:.1}", v) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sample_spans_the_ramp() {
        let colors = Palette::Viridis.sample(6);
        assert_eq!(colors.len(), 6);
        assert_eq!(colors[0], Rgb(68, 1, 84));
        assert_eq!(colors[5], Rgb(253, 231, 37));
        assert_eq!(colors[0].to_hex(), "#440154");
        assert_eq!(Palette::Ylgn.sample(1).len(), 1);
    }

    #[test]
    fn equal_width_bins_between_min_and_max() {
        let cmap = StepColormap::from_values(
            Palette::Viridis,
            6,
            vec![280.0, 292.0, f64::NAN, 316.0],
            "Beginn des Auflaufens 2018 (Tag des Jahres)",
        )
        .unwrap();

        assert_eq!(cmap.index.len(), 7);
        assert_relative_eq!(cmap.vmin(), 280.0);
        assert_relative_eq!(cmap.vmax(), 316.0);
        assert_relative_eq!(cmap.index[1], 286.0);
        assert_eq!(cmap.tick_labels()[3], "298");
    }

    #[test]
    fn color_lookup_is_last_bin_inclusive_and_clamped() {
        let cmap = StepColormap::from_values(Palette::Viridis, 4, vec![0.0, 100.0], "x").unwrap();
        assert_eq!(cmap.color_for(0.0), cmap.colors[0]);
        assert_eq!(cmap.color_for(24.9), cmap.colors[0]);
        assert_eq!(cmap.color_for(25.0), cmap.colors[1]);
        assert_eq!(cmap.color_for(100.0), cmap.colors[3]);
        assert_eq!(cmap.color_for(-50.0), cmap.colors[0]);
        assert_eq!(cmap.color_for(500.0), cmap.colors[3]);
    }

    #[test]
    fn single_value_widens_range() {
        let cmap = StepColormap::from_values(Palette::Viridis, 2, vec![150.0, 150.0], "x").unwrap();
        assert_relative_eq!(cmap.vmin(), 149.5);
        assert_relative_eq!(cmap.vmax(), 150.5);
        assert_eq!(cmap.tick_labels(), vec!["149.5", "150.0", "150.5"]);
    }

    #[test]
    fn no_finite_values_fall_back_to_unit_range() {
        for values in [vec![f64::NAN], Vec::new()] {
            let cmap = StepColormap::from_values(Palette::Viridis, 6, values, "x").unwrap();
            assert_eq!(cmap.index.len(), 7);
            assert_relative_eq!(cmap.vmin(), 0.0);
            assert_relative_eq!(cmap.vmax(), 1.0);
        }
        assert!(StepColormap::from_values(Palette::Viridis, 0, vec![1.0], "x").is_err());
    }
}
