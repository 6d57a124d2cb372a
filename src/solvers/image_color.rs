//! Dominant colour of a referenced PNG

use super::data_source::locate;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct ImageColorSolver {
    data: Arc<dyn DataSource>,
}

impl ImageColorSolver {
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

/// Most frequent RGB value, ties broken by first occurrence in row-major order
pub fn dominant_color(png: &[u8]) -> Result<[u8; 3], SolverError> {
    let image = image::load_from_memory(png)
        .map_err(|e| SolverError::parse("image", e))?
        .to_rgb8();

    // colour -> (count, first index)
    let mut counts: HashMap<[u8; 3], (u64, usize)> = HashMap::new();
    for (idx, pixel) in image.pixels().enumerate() {
        counts.entry(pixel.0).or_insert((0, idx)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(rgb, _)| rgb)
        .ok_or_else(|| SolverError::parse("image", "image has no pixels"))
}

pub fn to_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[async_trait]
impl Solver for ImageColorSolver {
    fn name(&self) -> &'static str {
        "image_color"
    }

    fn sentinel(&self) -> &'static str {
        "#000000"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let url = locate(
            &request.origin_url,
            &request.question_text,
            request.markup(),
            &[".png"],
        )
        .ok_or_else(|| SolverError::missing("PNG image"))??;

        let bytes = self.data.get_bytes(&url).await?;
        let rgb = dominant_color(&bytes)?;
        debug!(url, color = %to_hex(rgb), "Dominant colour computed");

        Ok(to_hex(rgb))
    }
}
