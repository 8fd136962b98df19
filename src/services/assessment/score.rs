pub(crate) fn calculate_score(
    credits: impl IntoIterator<Item = f64>,
    max_points: f64,
    bonus_points: f64,
) -> f64 {
    if max_points <= 0.0 {
        return 0.0;
    }

    let total: f64 = credits.into_iter().sum();
    let reachable = max_points + bonus_points.max(0.0);
    let clamped = total.clamp(0.0, reachable);
    (clamped / max_points * 10_000.0).round() / 100.0
}
