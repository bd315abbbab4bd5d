use std::cmp::Ordering;

use rand::Rng;

/// Shuffled train/test split of `n` rows. The test side gets
/// ceil(test_fraction * n) rows and the rest go to training.
pub fn train_test_indices<R: Rng>(n: usize, test_fraction: f64, rng: &mut R) -> (Vec<usize>, Vec<usize>) {
    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let mut indices: Vec<usize> = (0..n).collect();
    rng.shuffle(&mut indices);

    let train = indices.split_off(n_test);
    (train, indices)
}

/// Train/validation split that keeps every class's share roughly equal on
/// both sides. `classes[i]` is the class index of row i.
///
/// The validation side gets ceil(fraction * n) rows overall. Each class takes
/// the floor of its proportional share and the leftover rows go to the classes
/// with the largest remainders. A class never gives up all of its rows, and
/// with two or more rows at least one is held out.
pub fn stratified_indices<R: Rng>(
    classes: &[usize],
    n_classes: usize,
    validation_fraction: f64,
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let n_rows = classes.len();
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in classes.iter().enumerate() {
        by_class[class].push(row);
    }
    if n_rows == 0 {
        return (Vec::new(), Vec::new());
    }

    let n_validation = ((validation_fraction * n_rows as f64).ceil() as usize).min(n_rows - 1);
    let mut quotas = Vec::with_capacity(n_classes);
    let mut remainders = Vec::with_capacity(n_classes);
    for rows in &by_class {
        let exact = n_validation as f64 * rows.len() as f64 / n_rows as f64;
        let quota = (exact.floor() as usize).min(rows.len().saturating_sub(1));
        quotas.push(quota);
        remainders.push(exact - quota as f64);
    }

    let mut order: Vec<usize> = (0..n_classes).collect();
    order.sort_by(|&a, &b| {
        remainders[b]
            .partial_cmp(&remainders[a])
            .unwrap_or(Ordering::Equal)
            .then(by_class[b].len().cmp(&by_class[a].len()))
    });
    let mut missing = n_validation - quotas.iter().sum::<usize>();
    while missing > 0 {
        let mut assigned = false;
        for &class in &order {
            if missing > 0 && quotas[class] + 1 < by_class[class].len() {
                quotas[class] += 1;
                missing -= 1;
                assigned = true;
            }
        }
        if !assigned {
            break;
        }
    }

    let mut train = Vec::with_capacity(n_rows);
    let mut validation = Vec::with_capacity(n_validation);
    for (rows, &quota) in by_class.iter_mut().zip(&quotas) {
        rng.shuffle(rows);
        validation.extend_from_slice(&rows[..quota]);
        train.extend_from_slice(&rows[quota..]);
    }

    // Only when every class is a singleton.
    if validation.is_empty() && train.len() > 1 {
        let largest = (0..n_classes)
            .max_by_key(|&c| by_class[c].len())
            .unwrap_or(0);
        if let Some(pos) = train.iter().position(|&row| classes[row] == largest) {
            validation.push(train.remove(pos));
        }
    }

    rng.shuffle(&mut train);
    rng.shuffle(&mut validation);
    (train, validation)
}
