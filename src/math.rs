use rand::distributions::{IndependentSample, Range};
use rand::Rng;

/// Dense row-major matrix. Rows are samples wherever a matrix holds data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub mem: Vec<f64>,
    pub rows: usize,
    pub cols: usize,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        return Self {
            mem: Vec::with_capacity(cols * rows),
            rows: rows,
            cols: cols,
        };
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix::new(rows, cols).init_with(0.0)
    }

    pub fn new_same_dim(m: &Matrix) -> Self {
        Matrix::zeros(m.rows, m.cols)
    }

    pub fn from_vec(rows: usize, cols: usize, mem: Vec<f64>) -> Self {
        assert!(
            mem.len() == rows * cols,
            "Dimensions invalid for from_vec: {} values for {}x{}",
            mem.len(),
            rows,
            cols
        );

        Matrix { mem, rows, cols }
    }

    pub fn init_with(mut self, val: f64) -> Self {
        for _ in 0..self.rows * self.cols {
            self.mem.push(val);
        }

        return self;
    }

    /// Fills with samples from U(-bound, bound).
    pub fn init_uniform<R: Rng>(mut self, bound: f64, rng: &mut R) -> Self {
        let range = Range::new(-bound, bound);

        for _ in 0..self.rows * self.cols {
            self.mem.push(range.ind_sample(rng));
        }

        return self;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        let row_start = row * self.cols;
        &self.mem[row_start..row_start + self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let row_start = row * self.cols;
        &mut self.mem[row_start..row_start + self.cols]
    }

    /// Copies the given rows, in order, into a new matrix.
    pub fn select_rows(&self, indices: &[usize]) -> Matrix {
        let mut res = Matrix::new(indices.len(), self.cols);
        for &row in indices {
            res.mem.extend_from_slice(self.row(row));
        }

        return res;
    }

    /// self * m
    pub fn dot(&self, m: &Matrix) -> Matrix {
        let mut res = Matrix::zeros(self.rows, m.cols);
        gemm(self, false, m, false, &mut res);
        return res;
    }

    /// self.T * m
    pub fn t_dot(&self, m: &Matrix) -> Matrix {
        let mut res = Matrix::zeros(self.cols, m.cols);
        gemm(self, true, m, false, &mut res);
        return res;
    }

    /// self * m.T
    pub fn dot_t(&self, m: &Matrix) -> Matrix {
        let mut res = Matrix::zeros(self.rows, m.rows);
        gemm(self, false, m, true, &mut res);
        return res;
    }

    /// Adds `bias` to every row.
    pub fn add_row_vec(&mut self, bias: &[f64]) {
        assert!(
            self.cols == bias.len(),
            "Dimensions invalid for add_row_vec: {}x{} + 1x{}",
            self.rows,
            self.cols,
            bias.len()
        );

        for row in 0..self.rows {
            for (val, b) in self.row_mut(row).iter_mut().zip(bias) {
                *val += *b;
            }
        }
    }

    pub fn sub(&mut self, mat: &Matrix) {
        assert!(
            self.rows == mat.rows && self.cols == mat.cols,
            "Dimensions invalid for sub: \
             {}x{} != {}x{}",
            self.rows,
            self.cols,
            mat.rows,
            mat.cols
        );

        for i in 0..self.rows * self.cols {
            self.mem[i] -= mat.mem[i];
        }
    }

    /// self += alpha * mat
    pub fn add_scaled(&mut self, alpha: f64, mat: &Matrix) {
        assert!(
            self.rows == mat.rows && self.cols == mat.cols,
            "Dimensions invalid for add_scaled: \
             {}x{} != {}x{}",
            self.rows,
            self.cols,
            mat.rows,
            mat.cols
        );

        for i in 0..self.rows * self.cols {
            self.mem[i] += alpha * mat.mem[i];
        }
    }

    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for val in self.mem.iter_mut() {
            *val = f(*val);
        }
    }

    /// Column means.
    pub fn mean_rows(&self) -> Vec<f64> {
        let mut res = vec![0.0; self.cols];
        if self.rows == 0 {
            return res;
        }

        for row in 0..self.rows {
            for (acc, val) in res.iter_mut().zip(self.row(row)) {
                *acc += *val;
            }
        }
        for acc in res.iter_mut() {
            *acc /= self.rows as f64;
        }

        return res;
    }

    pub fn sum_squares(&self) -> f64 {
        self.mem.iter().map(|v| v * v).sum()
    }
}

/// res = op(a) * op(b), where op transposes when the flag is set.
pub fn gemm(a: &Matrix, a_t: bool, b: &Matrix, b_t: bool, res: &mut Matrix) {
    let (m, k) = if a_t { (a.cols, a.rows) } else { (a.rows, a.cols) };
    let (kb, n) = if b_t { (b.cols, b.rows) } else { (b.rows, b.cols) };
    assert!(
        k == kb && res.rows == m && res.cols == n,
        "Dimensions invalid for product: \
         {}x{} * {}x{} = {}x{}",
        m,
        k,
        kb,
        n,
        res.rows,
        res.cols
    );
    assert!(
        a.mem.len() == a.rows * a.cols && b.mem.len() == b.rows * b.cols,
        "Operand matrix is not initialized: {} values for {}x{}, {} values for {}x{}",
        a.mem.len(),
        a.rows,
        a.cols,
        b.mem.len(),
        b.rows,
        b.cols
    );
    assert!(res.mem.len() == m * n, "Result matrix is not initialized");

    if m == 0 || n == 0 {
        return;
    }
    if k == 0 {
        for val in res.mem.iter_mut() {
            *val = 0.0;
        }
        return;
    }

    let (rsa, csa) = if a_t {
        (1, a.cols as isize)
    } else {
        (a.cols as isize, 1)
    };
    let (rsb, csb) = if b_t {
        (1, b.cols as isize)
    } else {
        (b.cols as isize, 1)
    };

    // Strides above describe exactly the buffers passed in, all of which were
    // checked against m, k and n.
    unsafe {
        matrixmultiply::dgemm(
            m,
            k,
            n,
            1.0,
            a.mem.as_ptr(),
            rsa,
            csa,
            b.mem.as_ptr(),
            rsb,
            csb,
            0.0,
            res.mem.as_mut_ptr(),
            res.cols as isize,
            1,
        );
    }
}

/// Index and value of the largest component; the first one wins on ties.
pub fn max_component(xs: &[f64]) -> (usize, f64) {
    assert!(xs.len() > 0);
    let mut max = xs[0];
    let mut max_i = 0;

    for i in 1..xs.len() {
        let val = xs[i];
        if val > max {
            max = val;
            max_i = i;
        }
    }

    return (max_i, max);
}
