use std::cmp::Ordering;

use crate::error::{GeometryError, OperationError, Result};
use crate::geometry::Envelope2D;
use crate::index::{bucket_sort, IntervalCursor, IntervalTree};

/// Below this many boxes on a side the sweep is replaced by a pairwise
/// check; tree upkeep costs more than it saves on inputs this small.
const BRUTE_FORCE_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    RedRed,
    RedBlue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Construction {
    Idle,
    Single,
    Red,
    Blue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepState {
    NotReady,
    Initialize,
    InitializeRedBlue,
    Sweep,
    Iterate,
    SweepRedBlue,
    ResetRed,
    ResetBlue,
    IterateRed,
    IterateBlue,
    BruteForce,
    BruteForceRedBlue,
    Done,
}

/// One color of boxes and its sweep bookkeeping.
#[derive(Debug)]
struct EnvelopeSet {
    handles: Vec<usize>,
    envelopes: Vec<Envelope2D>,
    inflated: Vec<Envelope2D>,
    /// Y endpoint codes `(index << 1) | is_top`, sorted ascending.
    ends: Vec<usize>,
    /// Number of endpoints still to sweep; the next one is `ends[remaining - 1]`.
    remaining: usize,
    tree: IntervalTree,
    cursor: IntervalCursor,
    queue: Vec<usize>,
    queue_pos: Vec<Option<usize>>,
}

impl EnvelopeSet {
    fn new() -> Self {
        Self {
            handles: Vec::new(),
            envelopes: Vec::new(),
            inflated: Vec::new(),
            ends: Vec::new(),
            remaining: 0,
            tree: IntervalTree::new_dynamic(),
            cursor: IntervalCursor::new(),
            queue: Vec::new(),
            queue_pos: Vec::new(),
        }
    }

    fn clear(&mut self) {
        self.handles.clear();
        self.envelopes.clear();
        self.inflated.clear();
        self.ends.clear();
        self.remaining = 0;
        self.queue.clear();
        self.queue_pos.clear();
    }

    fn len(&self) -> usize {
        self.envelopes.len()
    }

    fn push(&mut self, handle: usize, envelope: Envelope2D) -> Result<()> {
        if envelope.is_empty() {
            return Err(GeometryError::Degenerate("cannot add an empty envelope".to_owned()).into());
        }
        self.handles.push(handle);
        self.envelopes.push(envelope);
        Ok(())
    }

    /// Inflates the boxes, registers their x-projections and sorts the y
    /// endpoints.
    fn finish(&mut self, tolerance: f64) -> Result<()> {
        let half = 0.5 * tolerance;
        self.inflated = self.envelopes.iter().map(|e| e.inflated(half)).collect();

        self.tree.start_construction();
        for env in &self.inflated {
            self.tree.add_interval(env.x_interval())?;
        }
        self.tree.end_construction()?;

        self.ends = (0..2 * self.inflated.len()).collect();
        let inflated = &self.inflated;
        bucket_sort(
            &mut self.ends,
            |&code| end_y(inflated, code),
            |a, b| compare_y_ends(inflated, *a, *b),
        );
        self.remaining = self.ends.len();
        self.queue.clear();
        self.queue_pos = vec![None; self.inflated.len()];
        Ok(())
    }

    fn next_end(&self) -> Option<usize> {
        self.remaining.checked_sub(1).map(|i| self.ends[i])
    }

    fn has_no_active(&self) -> bool {
        self.tree.size() == 0 && self.queue.is_empty()
    }

    fn enqueue(&mut self, index: usize) {
        self.queue_pos[index] = Some(self.queue.len());
        self.queue.push(index);
    }

    /// Ends a box: drops it from the deferred queue if it never made it into
    /// the tree, otherwise from the tree.
    fn deactivate(&mut self, index: usize) {
        if let Some(pos) = self.queue_pos[index].take() {
            self.queue.swap_remove(pos);
            if let Some(&moved) = self.queue.get(pos) {
                self.queue_pos[moved] = Some(pos);
            }
        } else {
            self.tree.remove_unchecked(index);
        }
    }

    fn flush_queue(&mut self) {
        for index in self.queue.drain(..) {
            self.queue_pos[index] = None;
            self.tree.insert_unchecked(index);
        }
    }
}

fn end_y(envelopes: &[Envelope2D], code: usize) -> f64 {
    let env = &envelopes[code >> 1];
    if code & 1 == 0 {
        env.ymin
    } else {
        env.ymax
    }
}

/// By y, then bottom endpoints before top endpoints, then by index.
fn compare_y_ends(envelopes: &[Envelope2D], a: usize, b: usize) -> Ordering {
    end_y(envelopes, a)
        .partial_cmp(&end_y(envelopes, b))
        .unwrap_or(Ordering::Equal)
        .then((a & 1).cmp(&(b & 1)))
        .then((a >> 1).cmp(&(b >> 1)))
}

/// Reports every pair of intersecting boxes, one pair at a time.
///
/// In red/red mode all pairs within one set are reported; in red/blue mode
/// only pairs with one box from each set. Boxes are closed, so touching
/// boxes intersect, and each box is inflated by half the tolerance on every
/// side.
///
/// # Algorithm
///
/// Sweeps a horizontal line from top to bottom. A box becomes active at its
/// top edge: the active boxes whose x-ranges overlap it are reported, then it
/// joins an interval tree over x. It leaves the tree at its bottom edge.
/// Red/blue sweeps keep one tree per color, test each new box against the
/// other color only, and park boxes while the other color has nothing active.
#[derive(Debug)]
pub struct Envelope2DIntersector {
    mode: Mode,
    construction: Construction,
    state: SweepState,
    tolerance: f64,
    red: EnvelopeSet,
    blue: EnvelopeSet,
    red_ready: bool,
    blue_ready: bool,
    current: usize,
    brute_force: (usize, usize),
    pair: Option<(usize, usize)>,
}

impl Default for Envelope2DIntersector {
    fn default() -> Self {
        Self::new()
    }
}

impl Envelope2DIntersector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::RedRed,
            construction: Construction::Idle,
            state: SweepState::NotReady,
            tolerance: 0.0,
            red: EnvelopeSet::new(),
            blue: EnvelopeSet::new(),
            red_ready: false,
            blue_ready: false,
            current: 0,
            brute_force: (0, 0),
            pair: None,
        }
    }

    /// Sets the inflation tolerance used by the next run. A set that is kept
    /// across red/blue runs is re-inflated when the other color is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidInput` for a negative or non-finite
    /// tolerance and `OperationError::InvalidState` while a run is primed or
    /// in progress.
    pub fn set_tolerance(&mut self, tolerance: f64) -> Result<()> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(OperationError::InvalidInput(format!(
                "tolerance must be finite and non-negative, got {tolerance}"
            ))
            .into());
        }
        if !matches!(self.state, SweepState::NotReady | SweepState::Done) {
            return Err(OperationError::InvalidState("set_tolerance during a run").into());
        }
        self.tolerance = tolerance;
        Ok(())
    }

    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn begin(&mut self, construction: Construction) -> Result<()> {
        if self.construction != Construction::Idle {
            return Err(OperationError::InvalidState("construction already in progress").into());
        }
        self.construction = construction;
        self.state = SweepState::NotReady;
        self.pair = None;
        Ok(())
    }

    fn check_phase(&self, construction: Construction, what: &'static str) -> Result<()> {
        if self.construction == construction {
            Ok(())
        } else {
            Err(OperationError::InvalidState(what).into())
        }
    }

    /// Opens a red/red construction bracket, dropping any previous boxes.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` while another bracket is open.
    pub fn start_construction(&mut self) -> Result<()> {
        self.begin(Construction::Single)?;
        self.mode = Mode::RedRed;
        self.red.clear();
        self.blue.clear();
        self.red_ready = false;
        self.blue_ready = false;
        Ok(())
    }

    /// Adds a box to the red/red set under a caller handle.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` outside the red/red bracket
    /// and `GeometryError::Degenerate` for an empty envelope.
    pub fn add_envelope(&mut self, handle: usize, envelope: Envelope2D) -> Result<()> {
        self.check_phase(Construction::Single, "add_envelope outside start_construction")?;
        self.red.push(handle, envelope)
    }

    /// Closes the red/red bracket and prepares the sweep.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` without a matching start.
    pub fn end_construction(&mut self) -> Result<()> {
        self.check_phase(Construction::Single, "end_construction without start_construction")?;
        self.red.finish(self.tolerance)?;
        self.red_ready = true;
        self.construction = Construction::Idle;
        self.state = SweepState::Initialize;
        Ok(())
    }

    fn begin_color(&mut self, construction: Construction) -> Result<()> {
        self.begin(construction)?;
        if self.mode != Mode::RedBlue {
            self.mode = Mode::RedBlue;
            self.red.clear();
            self.blue.clear();
            self.red_ready = false;
            self.blue_ready = false;
        }
        Ok(())
    }

    /// Closes a color bracket. Once both colors are ready the color that was
    /// not just rebuilt is re-primed, since a previous run consumed its
    /// endpoints and may have left boxes in its tree.
    fn end_color(&mut self, rebuilt: Construction) -> Result<()> {
        self.construction = Construction::Idle;
        if self.red_ready && self.blue_ready {
            if rebuilt == Construction::Red {
                self.blue.finish(self.tolerance)?;
            } else {
                self.red.finish(self.tolerance)?;
            }
            self.state = SweepState::InitializeRedBlue;
        }
        Ok(())
    }

    /// Opens the red bracket of a red/blue run.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` while another bracket is open.
    pub fn start_red_construction(&mut self) -> Result<()> {
        self.begin_color(Construction::Red)?;
        self.red.clear();
        self.red_ready = false;
        Ok(())
    }

    /// Adds a red box under a caller handle.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` outside the red bracket and
    /// `GeometryError::Degenerate` for an empty envelope.
    pub fn add_red_envelope(&mut self, handle: usize, envelope: Envelope2D) -> Result<()> {
        self.check_phase(Construction::Red, "add_red_envelope outside start_red_construction")?;
        self.red.push(handle, envelope)
    }

    /// Closes the red bracket.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` without a matching start.
    pub fn end_red_construction(&mut self) -> Result<()> {
        self.check_phase(Construction::Red, "end_red_construction without start_red_construction")?;
        self.red.finish(self.tolerance)?;
        self.red_ready = true;
        self.end_color(Construction::Red)
    }

    /// Opens the blue bracket of a red/blue run.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` while another bracket is open.
    pub fn start_blue_construction(&mut self) -> Result<()> {
        self.begin_color(Construction::Blue)?;
        self.blue.clear();
        self.blue_ready = false;
        Ok(())
    }

    /// Adds a blue box under a caller handle.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` outside the blue bracket and
    /// `GeometryError::Degenerate` for an empty envelope.
    pub fn add_blue_envelope(&mut self, handle: usize, envelope: Envelope2D) -> Result<()> {
        self.check_phase(Construction::Blue, "add_blue_envelope outside start_blue_construction")?;
        self.blue.push(handle, envelope)
    }

    /// Closes the blue bracket.
    ///
    /// # Errors
    ///
    /// Returns `OperationError::InvalidState` without a matching start.
    pub fn end_blue_construction(&mut self) -> Result<()> {
        self.check_phase(Construction::Blue, "end_blue_construction without start_blue_construction")?;
        self.blue.finish(self.tolerance)?;
        self.blue_ready = true;
        self.end_color(Construction::Blue)
    }

    /// Advances to the next intersecting pair. Returns `false` when the
    /// sweep is exhausted or construction is incomplete.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        loop {
            match self.state {
                SweepState::NotReady | SweepState::Done => {
                    self.pair = None;
                    return false;
                }
                SweepState::Initialize => {
                    if self.red.len() < BRUTE_FORCE_THRESHOLD {
                        tracing::debug!(boxes = self.red.len(), "red/red pairs by brute force");
                        self.brute_force = (0, 1);
                        self.state = SweepState::BruteForce;
                    } else {
                        tracing::debug!(boxes = self.red.len(), "red/red sweep");
                        self.state = SweepState::Sweep;
                    }
                }
                SweepState::InitializeRedBlue => {
                    if self.red.len() < BRUTE_FORCE_THRESHOLD
                        || self.blue.len() < BRUTE_FORCE_THRESHOLD
                    {
                        tracing::debug!(
                            red = self.red.len(),
                            blue = self.blue.len(),
                            "red/blue pairs by brute force"
                        );
                        self.brute_force = (0, 0);
                        self.state = SweepState::BruteForceRedBlue;
                    } else {
                        tracing::debug!(red = self.red.len(), blue = self.blue.len(), "red/blue sweep");
                        self.state = SweepState::SweepRedBlue;
                    }
                }
                SweepState::Sweep => self.sweep(),
                SweepState::Iterate => {
                    if let Some(other) = self.red.cursor.next(&self.red.tree) {
                        self.pair = Some((self.current, other));
                        return true;
                    }
                    self.red.tree.insert_unchecked(self.current);
                    self.red.remaining -= 1;
                    self.state = SweepState::Sweep;
                }
                SweepState::SweepRedBlue => self.sweep_red_blue(),
                SweepState::ResetRed => {
                    self.red.flush_queue();
                    self.state = SweepState::IterateRed;
                }
                SweepState::ResetBlue => {
                    self.blue.flush_queue();
                    self.state = SweepState::IterateBlue;
                }
                SweepState::IterateRed => {
                    if let Some(red) = self.red.cursor.next(&self.red.tree) {
                        self.pair = Some((red, self.current));
                        return true;
                    }
                    self.blue.tree.insert_unchecked(self.current);
                    self.blue.remaining -= 1;
                    self.state = SweepState::SweepRedBlue;
                }
                SweepState::IterateBlue => {
                    if let Some(blue) = self.blue.cursor.next(&self.blue.tree) {
                        self.pair = Some((self.current, blue));
                        return true;
                    }
                    self.red.tree.insert_unchecked(self.current);
                    self.red.remaining -= 1;
                    self.state = SweepState::SweepRedBlue;
                }
                SweepState::BruteForce => {
                    if self.brute_force_red_red() {
                        return true;
                    }
                    self.state = SweepState::Done;
                }
                SweepState::BruteForceRedBlue => {
                    if self.brute_force_red_blue() {
                        return true;
                    }
                    self.state = SweepState::Done;
                }
            }
        }
    }

    /// One red/red endpoint event.
    fn sweep(&mut self) {
        let Some(code) = self.red.next_end() else {
            self.state = SweepState::Done;
            return;
        };
        let index = code >> 1;
        if code & 1 == 0 {
            self.red.tree.remove_unchecked(index);
            self.red.remaining -= 1;
            return;
        }
        self.red.cursor.reset(self.red.inflated[index].x_interval(), 0.0);
        self.current = index;
        self.state = SweepState::Iterate;
    }

    /// One red/blue endpoint event from whichever color is ahead.
    fn sweep_red_blue(&mut self) {
        let (Some(red_code), Some(blue_code)) = (self.red.next_end(), self.blue.next_end()) else {
            // Once one color is used up no further cross pairs can start.
            self.state = SweepState::Done;
            return;
        };
        let red_y = end_y(&self.red.inflated, red_code);
        let blue_y = end_y(&self.blue.inflated, blue_code);
        let red_first = if red_y > blue_y {
            true
        } else if red_y < blue_y {
            false
        } else if red_code & 1 == 1 {
            true
        } else {
            // Blue tops go before red bottoms; two bottoms take red first.
            blue_code & 1 == 0
        };
        if red_first {
            self.sweep_red(red_code);
        } else {
            self.sweep_blue(blue_code);
        }
    }

    fn sweep_red(&mut self, code: usize) {
        let index = code >> 1;
        if code & 1 == 0 {
            self.red.deactivate(index);
            self.red.remaining -= 1;
            return;
        }
        if self.blue.has_no_active() {
            self.red.enqueue(index);
            self.red.remaining -= 1;
            return;
        }
        self.current = index;
        self.blue.cursor.reset(self.red.inflated[index].x_interval(), 0.0);
        self.state = if self.blue.queue.is_empty() {
            SweepState::IterateBlue
        } else {
            SweepState::ResetBlue
        };
    }

    fn sweep_blue(&mut self, code: usize) {
        let index = code >> 1;
        if code & 1 == 0 {
            self.blue.deactivate(index);
            self.blue.remaining -= 1;
            return;
        }
        if self.red.has_no_active() {
            self.blue.enqueue(index);
            self.blue.remaining -= 1;
            return;
        }
        self.current = index;
        self.red.cursor.reset(self.blue.inflated[index].x_interval(), 0.0);
        self.state = if self.red.queue.is_empty() {
            SweepState::IterateRed
        } else {
            SweepState::ResetRed
        };
    }

    fn brute_force_red_red(&mut self) -> bool {
        let n = self.red.len();
        while self.brute_force.0 < n {
            let (i, j) = self.brute_force;
            if j >= n {
                self.brute_force = (i + 1, i + 2);
                continue;
            }
            self.brute_force.1 += 1;
            if self.red.inflated[i].is_intersecting(&self.red.inflated[j]) {
                self.pair = Some((i, j));
                return true;
            }
        }
        false
    }

    fn brute_force_red_blue(&mut self) -> bool {
        let (n, m) = (self.red.len(), self.blue.len());
        while self.brute_force.0 < n {
            let (i, j) = self.brute_force;
            if j >= m {
                self.brute_force = (i + 1, 0);
                continue;
            }
            self.brute_force.1 += 1;
            if self.red.inflated[i].is_intersecting(&self.blue.inflated[j]) {
                self.pair = Some((i, j));
                return true;
            }
        }
        false
    }

    fn current_pair(&self) -> (usize, usize) {
        match self.pair {
            Some(pair) => pair,
            None => panic!("no current pair: call next() and check that it returned true"),
        }
    }

    /// First handle of the current red/red pair.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`next`](Self::next) returned `true`.
    #[must_use]
    pub fn handle_a(&self) -> usize {
        self.red.handles[self.current_pair().0]
    }

    /// Second handle of the current red/red pair.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`next`](Self::next) returned `true`.
    #[must_use]
    pub fn handle_b(&self) -> usize {
        let (_, b) = self.current_pair();
        match self.mode {
            Mode::RedRed => self.red.handles[b],
            Mode::RedBlue => self.blue.handles[b],
        }
    }

    /// Red handle of the current red/blue pair.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`next`](Self::next) returned `true`.
    #[must_use]
    pub fn red_element(&self) -> usize {
        self.handle_a()
    }

    /// Blue handle of the current red/blue pair.
    ///
    /// # Panics
    ///
    /// Panics unless the last call to [`next`](Self::next) returned `true`.
    #[must_use]
    pub fn blue_element(&self) -> usize {
        self.blue.handles[self.current_pair().1]
    }

    /// Drains the remaining pairs as `(handle_a, handle_b)` or
    /// `(red, blue)` tuples.
    pub fn pairs(&mut self) -> Pairs<'_> {
        Pairs { intersector: self }
    }
}

/// Iterator adapter over [`Envelope2DIntersector::next`].
#[derive(Debug)]
pub struct Pairs<'a> {
    intersector: &'a mut Envelope2DIntersector,
}

impl Iterator for Pairs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<(usize, usize)> {
        if self.intersector.next() {
            Some((self.intersector.handle_a(), self.intersector.handle_b()))
        } else {
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::GeoplanarError;

    fn normalized(mut pairs: Vec<(usize, usize)>, symmetric: bool) -> Vec<(usize, usize)> {
        if symmetric {
            for p in &mut pairs {
                if p.0 > p.1 {
                    *p = (p.1, p.0);
                }
            }
        }
        pairs.sort_unstable();
        pairs
    }

    fn red_red(boxes: &[Envelope2D], tolerance: f64) -> Vec<(usize, usize)> {
        let mut x = Envelope2DIntersector::new();
        x.start_construction().unwrap();
        x.set_tolerance(tolerance).unwrap();
        for (i, b) in boxes.iter().enumerate() {
            x.add_envelope(i, *b).unwrap();
        }
        x.end_construction().unwrap();
        normalized(x.pairs().collect(), true)
    }

    fn red_blue(red: &[Envelope2D], blue: &[Envelope2D]) -> Vec<(usize, usize)> {
        let mut x = Envelope2DIntersector::new();
        x.start_red_construction().unwrap();
        for (i, b) in red.iter().enumerate() {
            x.add_red_envelope(i, *b).unwrap();
        }
        x.end_red_construction().unwrap();
        x.start_blue_construction().unwrap();
        for (i, b) in blue.iter().enumerate() {
            x.add_blue_envelope(i, *b).unwrap();
        }
        x.end_blue_construction().unwrap();
        normalized(x.pairs().collect(), false)
    }

    fn brute_red_red(boxes: &[Envelope2D]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for i in 0..boxes.len() {
            for j in i + 1..boxes.len() {
                if boxes[i].is_intersecting(&boxes[j]) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    fn brute_red_blue(red: &[Envelope2D], blue: &[Envelope2D]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (i, r) in red.iter().enumerate() {
            for (j, b) in blue.iter().enumerate() {
                if r.is_intersecting(b) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    fn box_strategy() -> impl Strategy<Value = Envelope2D> {
        (0i32..60, 0i32..60, 0i32..12, 0i32..12).prop_map(|(x, y, w, h)| {
            Envelope2D::new(f64::from(x), f64::from(y), f64::from(x + w), f64::from(y + h))
        })
    }

    #[test]
    fn reports_only_the_overlapping_pair() {
        let a = Envelope2D::new(0.0, 0.0, 2.0, 2.0);
        let b = Envelope2D::new(1.0, 1.0, 3.0, 3.0);
        let c = Envelope2D::new(10.0, 10.0, 12.0, 12.0);

        let mut x = Envelope2DIntersector::new();
        x.start_construction().unwrap();
        x.add_envelope(100, a).unwrap();
        x.add_envelope(200, b).unwrap();
        x.add_envelope(300, c).unwrap();
        x.end_construction().unwrap();

        assert!(x.next());
        let pair = (x.handle_a().min(x.handle_b()), x.handle_a().max(x.handle_b()));
        assert_eq!(pair, (100, 200));
        assert!(!x.next());
        assert!(!x.next());
    }

    #[test]
    fn sweep_path_matches_brute_force_on_a_grid() {
        let mut boxes = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                let (x, y) = (f64::from(i) * 2.0, f64::from(j) * 2.0);
                boxes.push(Envelope2D::new(x, y, x + 2.0, y + 2.0));
            }
        }
        assert_eq!(red_red(&boxes, 0.0), brute_red_red(&boxes));
    }

    #[test]
    fn tolerance_catches_near_misses() {
        let boxes = [
            Envelope2D::new(0.0, 0.0, 1.0, 1.0),
            Envelope2D::new(1.05, 0.0, 2.0, 1.0),
        ];
        assert!(red_red(&boxes, 0.0).is_empty());
        assert_eq!(red_red(&boxes, 0.1), vec![(0, 1)]);
    }

    #[test]
    fn below_and_above_threshold_agree() {
        let small = [
            Envelope2D::new(0.0, 0.0, 2.0, 2.0),
            Envelope2D::new(1.0, 1.0, 3.0, 3.0),
            Envelope2D::new(2.0, 0.0, 4.0, 1.0),
            Envelope2D::new(5.0, 5.0, 6.0, 6.0),
        ];
        let below = red_red(&small, 0.0);
        let mut padded = small.to_vec();
        for k in 0..20 {
            let x = 1000.0 + 10.0 * f64::from(k);
            padded.push(Envelope2D::new(x, x, x + 1.0, x + 1.0));
        }
        let above: Vec<_> = red_red(&padded, 0.0)
            .into_iter()
            .filter(|&(a, b)| a < small.len() && b < small.len())
            .collect();
        assert_eq!(below, above);
        assert_eq!(below, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn red_blue_never_pairs_same_color() {
        let red: Vec<_> = (0..12)
            .map(|i| {
                let x = f64::from(i);
                Envelope2D::new(x, 0.0, x + 1.5, 1.0)
            })
            .collect();
        let blue: Vec<_> = (0..12)
            .map(|i| {
                let x = f64::from(i) + 0.5;
                Envelope2D::new(x, 0.5, x + 0.2, 3.0)
            })
            .collect();
        assert_eq!(red_blue(&red, &blue), brute_red_blue(&red, &blue));
    }

    #[test]
    fn red_blue_with_sparse_side_uses_deferred_queue() {
        // Blue boxes sit below a tall column of red boxes, so most red boxes
        // start while no blue box is active.
        let red: Vec<_> = (0..15)
            .map(|i| {
                let y = f64::from(i) * 3.0;
                Envelope2D::new(0.0, y, 10.0, y + 4.0)
            })
            .collect();
        let blue: Vec<_> = (0..12)
            .map(|i| {
                let x = f64::from(i);
                Envelope2D::new(x, -2.0, x + 0.5, 1.0 + f64::from(i % 3) * 4.0)
            })
            .collect();
        assert_eq!(red_blue(&red, &blue), brute_red_blue(&red, &blue));
    }

    #[test]
    fn usage_errors_fail_fast() {
        let mut x = Envelope2DIntersector::new();
        assert!(x.add_envelope(0, Envelope2D::new(0.0, 0.0, 1.0, 1.0)).is_err());
        assert!(x.end_construction().is_err());
        assert!(!x.next());

        x.start_construction().unwrap();
        assert!(matches!(
            x.start_construction(),
            Err(GeoplanarError::Operation(OperationError::InvalidState(_)))
        ));
        assert!(x.add_red_envelope(0, Envelope2D::new(0.0, 0.0, 1.0, 1.0)).is_err());
        assert!(x.add_envelope(0, Envelope2D::empty()).is_err());
        assert!(x.set_tolerance(-1.0).is_err());
        x.end_construction().unwrap();
        assert!(x.set_tolerance(1.0).is_err());
        assert!(!x.next());
    }

    #[test]
    fn red_blue_waits_for_both_colors() {
        let mut x = Envelope2DIntersector::new();
        x.start_red_construction().unwrap();
        x.add_red_envelope(7, Envelope2D::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        x.end_red_construction().unwrap();
        assert!(!x.next());
        x.start_blue_construction().unwrap();
        x.add_blue_envelope(9, Envelope2D::new(0.5, 0.5, 2.0, 2.0)).unwrap();
        x.end_blue_construction().unwrap();
        assert!(x.next());
        assert_eq!((x.red_element(), x.blue_element()), (7, 9));
        assert!(!x.next());
    }

    fn tall_column(count: i32, x: f64) -> Vec<Envelope2D> {
        (0..count)
            .map(|i| {
                let y = f64::from(i) * 2.0;
                Envelope2D::new(x, y, x + 1.0, y + 3.0)
            })
            .collect()
    }

    #[test]
    fn rebuilding_one_color_keeps_the_other() {
        let red = tall_column(12, 0.0);
        let blue = tall_column(12, 0.5);
        let expected = brute_red_blue(&red, &blue);

        let mut x = Envelope2DIntersector::new();
        x.start_red_construction().unwrap();
        for (i, b) in red.iter().enumerate() {
            x.add_red_envelope(i, *b).unwrap();
        }
        x.end_red_construction().unwrap();
        x.start_blue_construction().unwrap();
        for (i, b) in blue.iter().enumerate() {
            x.add_blue_envelope(i, *b).unwrap();
        }
        x.end_blue_construction().unwrap();
        let first = normalized(x.pairs().collect(), false);
        assert_eq!(first, expected);

        x.start_red_construction().unwrap();
        for (i, b) in red.iter().enumerate() {
            x.add_red_envelope(i, *b).unwrap();
        }
        x.end_red_construction().unwrap();
        assert_eq!(normalized(x.pairs().collect(), false), expected);

        // Abandon a run part way, then rebuild the other side.
        x.start_red_construction().unwrap();
        for (i, b) in red.iter().enumerate() {
            x.add_red_envelope(i, *b).unwrap();
        }
        x.end_red_construction().unwrap();
        assert!(x.next());
        assert!(x.next());
        x.start_blue_construction().unwrap();
        for (i, b) in blue.iter().enumerate() {
            x.add_blue_envelope(i, *b).unwrap();
        }
        x.end_blue_construction().unwrap();
        assert_eq!(normalized(x.pairs().collect(), false), expected);
    }

    #[test]
    fn tolerance_can_change_between_runs() {
        let boxes = [
            Envelope2D::new(0.0, 0.0, 1.0, 1.0),
            Envelope2D::new(1.5, 0.0, 2.5, 1.0),
        ];
        assert!(red_red(&boxes, 0.0).is_empty());

        let mut x = Envelope2DIntersector::new();
        x.start_construction().unwrap();
        for (i, b) in boxes.iter().enumerate() {
            x.add_envelope(i, *b).unwrap();
        }
        x.end_construction().unwrap();
        assert!(x.set_tolerance(1.0).is_err());
        assert_eq!(x.pairs().count(), 0);

        x.set_tolerance(1.0).unwrap();
        x.start_construction().unwrap();
        for (i, b) in boxes.iter().enumerate() {
            x.add_envelope(i, *b).unwrap();
        }
        x.end_construction().unwrap();
        assert_eq!(normalized(x.pairs().collect(), true), vec![(0, 1)]);
    }

    #[test]
    fn kept_color_picks_up_new_tolerance() {
        let red = [Envelope2D::new(0.0, 0.0, 1.0, 1.0)];
        let blue = [Envelope2D::new(1.5, 0.0, 2.5, 1.0)];
        let mut x = Envelope2DIntersector::new();
        x.start_red_construction().unwrap();
        x.add_red_envelope(0, red[0]).unwrap();
        x.end_red_construction().unwrap();
        x.start_blue_construction().unwrap();
        x.add_blue_envelope(0, blue[0]).unwrap();
        x.end_blue_construction().unwrap();
        assert!(!x.next());

        x.set_tolerance(1.0).unwrap();
        x.start_blue_construction().unwrap();
        x.add_blue_envelope(0, blue[0]).unwrap();
        x.end_blue_construction().unwrap();
        assert_eq!(x.pairs().collect::<Vec<_>>(), vec![(0, 0)]);
    }

    proptest! {
        #[test]
        fn red_red_matches_brute_force(boxes in proptest::collection::vec(box_strategy(), 0..80)) {
            let pairs = red_red(&boxes, 0.0);
            let mut dedup = pairs.clone();
            dedup.dedup();
            prop_assert_eq!(&pairs, &dedup);
            prop_assert_eq!(pairs, brute_red_red(&boxes));
        }

        #[test]
        fn red_blue_matches_brute_force(
            red in proptest::collection::vec(box_strategy(), 0..50),
            blue in proptest::collection::vec(box_strategy(), 0..50),
        ) {
            prop_assert_eq!(red_blue(&red, &blue), brute_red_blue(&red, &blue));
        }
    }
}
