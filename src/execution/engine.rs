//! Execution engine implementation.
//!
//! The engine replays a graph's cached execution order once per pixel of the
//! sink's raster and collects the sink's finalized colors into an image.
//!
//! Rows are the unit of work. Each row gets its own [`PortValues`] and its
//! own random source, so rows can be rendered in any order or in parallel
//! with identical results for a fixed seed.

use crate::core::context::RuntimeContext;
use crate::core::error::{ExecutionError, ExecutionResult};
use crate::core::port::{PortValues, SlotId};
use crate::core::texture::Texture;
use crate::core::types::Value;
use crate::graph::structure::{Graph, GraphNode};
use image::RgbaImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Execution options.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Render rows in parallel on a rayon pool.
    pub parallel: bool,
    /// Maximum number of parallel threads (0 = use all available).
    pub max_threads: usize,
    /// Seed for randomized operators; entropy-seeded when unset.
    pub seed: Option<u64>,
}

impl ExecutionOptions {
    /// Create a new options builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set maximum threads.
    pub fn with_max_threads(mut self, max: usize) -> Self {
        self.max_threads = max;
        self
    }

    /// Fix the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Execution statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionStats {
    /// Raster width.
    pub width: u32,
    /// Raster height.
    pub height: u32,
    /// Number of pixels evaluated.
    pub pixels: u64,
    /// Number of nodes computed for each pixel.
    pub nodes_per_pixel: usize,
    /// Total execution time.
    pub total_duration: Duration,
    /// Whether rows were rendered in parallel.
    pub parallel: bool,
}

/// Everything a row needs, borrowed immutably from the graph.
struct RenderPlan<'g> {
    nodes: Vec<&'g GraphNode>,
    color_slot: SlotId,
    sink: &'g str,
    defaults: Arc<[Value]>,
    width: u32,
    height: u32,
    seed: Option<u64>,
}

impl RenderPlan<'_> {
    fn row_rng(&self, y: u32) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(y)),
            None => StdRng::from_entropy(),
        }
    }

    /// Evaluate every pixel of row `y` into `row` (RGBA8, `width * 4` bytes).
    fn render_row(&self, y: u32, row: &mut [u8]) -> ExecutionResult<()> {
        let mut values = PortValues::new(Arc::clone(&self.defaults));
        let mut rng = self.row_rng(y);

        for (x, pixel) in (0..self.width).zip(row.chunks_exact_mut(4)) {
            let runtime = RuntimeContext::for_pixel(x, y, self.width, self.height);
            values.reset();

            for node in &self.nodes {
                node.compute(&mut values, runtime, &mut rng)?;
            }

            let finalized = values.read(self.color_slot);
            let color = finalized.as_color().ok_or_else(|| ExecutionError::TypeMismatch {
                node: self.sink.to_string(),
                port: "Color".to_string(),
                expected: crate::core::types::PortType::Color,
                found: finalized.get_type(),
            })?;
            pixel.copy_from_slice(&[color.r, color.g, color.b, color.a]);
        }
        Ok(())
    }
}

/// The execution engine.
#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine {
    options: ExecutionOptions,
}

impl ExecutionEngine {
    /// Create a new execution engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the given options.
    pub fn with_options(options: ExecutionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Render a new image of the sink's size.
    pub fn execute(&self, graph: &mut Graph) -> ExecutionResult<(Texture, ExecutionStats)> {
        let mut image = Texture::empty();
        let stats = self.execute_into(graph, &mut image)?;
        Ok((image, stats))
    }

    /// Render into `dest`, replacing its contents with the sink's raster.
    ///
    /// `dest` is only touched once every pixel has been evaluated, so a
    /// failed run leaves it as it was.
    pub fn execute_into(
        &self,
        graph: &mut Graph,
        dest: &mut Texture,
    ) -> ExecutionResult<ExecutionStats> {
        if graph.sink().is_none() {
            return Err(ExecutionError::MissingSinkNode);
        }
        if !graph.is_valid() {
            return Err(ExecutionError::InvalidGraph);
        }
        if graph.execution_order().is_none() {
            graph.compute_order()?;
        }
        if self.options.seed.is_none() && !graph.is_deterministic() {
            log::debug!("Graph has randomized nodes and no seed; output varies between runs");
        }

        let start_time = Instant::now();
        let buffer = {
            let plan = self.plan(graph)?;
            log::info!(
                "Rendering {}x{} through {} nodes{}",
                plan.width,
                plan.height,
                plan.nodes.len(),
                if self.options.parallel { " (parallel)" } else { "" }
            );
            self.render(&plan)?
        };

        let stats = ExecutionStats {
            width: buffer.width(),
            height: buffer.height(),
            pixels: u64::from(buffer.width()) * u64::from(buffer.height()),
            nodes_per_pixel: graph.node_count(),
            total_duration: start_time.elapsed(),
            parallel: self.options.parallel,
        };

        *dest = Texture::from_buffer(buffer);
        graph.mark_executed();
        log::info!("Rendered {} pixels in {:?}", stats.pixels, stats.total_duration);
        Ok(stats)
    }

    fn plan<'g>(&self, graph: &'g Graph) -> ExecutionResult<RenderPlan<'g>> {
        let sink = graph.sink().ok_or(ExecutionError::MissingSinkNode)?;
        let capability = sink.as_sink().ok_or(ExecutionError::MissingSinkNode)?;
        let (width, height) = capability.raster_size();
        let color_port = capability.color_port();
        let color_slot = sink
            .ports()
            .output(color_port)
            .map(|port| port.slot())
            .ok_or_else(|| ExecutionError::UnknownPort {
                node: sink.name().to_string(),
                port: color_port.to_string(),
            })?;

        let order = graph.execution_order().unwrap_or_default();
        let nodes = order
            .iter()
            .map(|name| graph.node(name).map_err(ExecutionError::from))
            .collect::<ExecutionResult<Vec<_>>>()?;

        Ok(RenderPlan {
            nodes,
            color_slot,
            sink: sink.name(),
            defaults: graph.slot_defaults(),
            width,
            height,
            seed: self.options.seed,
        })
    }

    fn render(&self, plan: &RenderPlan<'_>) -> ExecutionResult<RgbaImage> {
        let mut buffer = RgbaImage::new(plan.width, plan.height);
        let row_bytes = plan.width as usize * 4;

        if !self.options.parallel {
            for (y, row) in buffer.chunks_exact_mut(row_bytes).enumerate() {
                plan.render_row(y as u32, row)?;
            }
            return Ok(buffer);
        }

        let render_rows = |buffer: &mut RgbaImage| {
            buffer
                .par_chunks_exact_mut(row_bytes)
                .enumerate()
                .try_for_each(|(y, row)| plan.render_row(y as u32, row))
        };

        if self.options.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.max_threads)
                .build()
                .map_err(|e| ExecutionError::ThreadPool(e.to_string()))?;
            pool.install(|| render_rows(&mut buffer))?;
        } else {
            render_rows(&mut buffer)?;
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::port::Attribute;
    use crate::core::types::Color;
    use crate::filters::builtin::TextureSource;
    use crate::graph::structure::GraphState;

    fn gradient(width: u32, height: u32) -> Texture {
        let mut texture = Texture::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let color = Color::new((x * 40) as u8, (y * 40) as u8, 7, 255);
                texture.set(x as i64, y as i64, color);
            }
        }
        texture
    }

    fn copy_graph(source: Texture, attributes: &[Attribute]) -> Graph {
        let mut graph = Graph::new();
        graph
            .add_node("tex", Box::new(TextureSource::new(source)))
            .unwrap();
        graph.register_node("sampler", "sample_texture", &[]).unwrap();
        graph.register_node("out", "output", attributes).unwrap();
        graph.bind("tex", "Tex", "sampler", "Tex").unwrap();
        graph.bind("sampler", "Out", "out", "In").unwrap();
        graph
    }

    #[test]
    fn test_execute_copies_texture() {
        let source = gradient(4, 3);
        let mut graph = copy_graph(
            source.clone(),
            &[Attribute::named("width", "4"), Attribute::named("height", "3")],
        );

        let (image, stats) = ExecutionEngine::new().execute(&mut graph).unwrap();
        assert_eq!(image, source);
        assert_eq!(stats.pixels, 12);
        assert_eq!(stats.nodes_per_pixel, 3);
        assert_eq!(graph.state(), GraphState::Executed);
    }

    #[test]
    fn test_missing_sink_leaves_destination_untouched() {
        let mut graph = Graph::new();
        graph.register_node("inv", "invert", &[]).unwrap();

        let mut dest = Texture::filled(2, 2, Color::WHITE);
        let result = ExecutionEngine::new().execute_into(&mut graph, &mut dest);
        assert_eq!(result, Err(ExecutionError::MissingSinkNode));
        assert_eq!(dest, Texture::filled(2, 2, Color::WHITE));
    }

    #[test]
    fn test_invalid_graph_refuses_to_run() {
        let mut graph = copy_graph(gradient(2, 2), &[]);
        graph.register_node("bad", "no_such_kind", &[]).unwrap_err();

        let result = ExecutionEngine::new().execute(&mut graph);
        assert!(matches!(result, Err(ExecutionError::InvalidGraph)));
    }

    #[test]
    fn test_unbound_required_input_fails_loudly() {
        let mut graph = Graph::new();
        graph.register_node("inv", "invert", &[]).unwrap();
        let size = [Attribute::named("width", "1"), Attribute::named("height", "1")];
        graph.register_node("out", "output", &size).unwrap();
        graph.bind("inv", "Out", "out", "In").unwrap();

        let result = ExecutionEngine::new().execute(&mut graph);
        assert_eq!(
            result.map(|(image, _)| image),
            Err(ExecutionError::UnboundInput {
                node: "inv".to_string(),
                port: "In".to_string()
            })
        );
    }

    #[test]
    fn test_parallel_matches_sequential_for_fixed_seed() {
        let attributes = [Attribute::named("width", "5"), Attribute::named("height", "6")];
        let build = || {
            let mut graph = Graph::new();
            graph
                .add_node("tex", Box::new(TextureSource::new(gradient(5, 6))))
                .unwrap();
            graph.register_node("sampler", "sample_texture", &[]).unwrap();
            let probability = [Attribute::named("probability", "0.5")];
            graph
                .register_node("noise", "salt_pepper_noise", &probability)
                .unwrap();
            graph.register_node("out", "output", &attributes).unwrap();
            graph.bind("tex", "Tex", "sampler", "Tex").unwrap();
            graph.bind("sampler", "Out", "noise", "In").unwrap();
            graph.bind("noise", "Out", "out", "In").unwrap();
            graph
        };

        let sequential = ExecutionEngine::with_options(ExecutionOptions::new().with_seed(42))
            .execute(&mut build())
            .unwrap()
            .0;
        let parallel = ExecutionEngine::with_options(
            ExecutionOptions::new()
                .with_seed(42)
                .with_parallel(true)
                .with_max_threads(2),
        )
        .execute(&mut build())
        .unwrap()
        .0;

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_execution_options_builder() {
        let options = ExecutionOptions::new()
            .with_parallel(true)
            .with_max_threads(4)
            .with_seed(7);

        assert!(options.parallel);
        assert_eq!(options.max_threads, 4);
        assert_eq!(options.seed, Some(7));
    }
}
