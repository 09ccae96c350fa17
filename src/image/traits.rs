/// Read-only access to an interleaved raster, row by row.
pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Elements between the starts of two consecutive rows.
    fn stride(&self) -> usize;

    /// Interleaved samples per pixel.
    fn channels(&self) -> usize {
        1
    }

    /// The `width · channels` samples of row `y`.
    fn row(&self, y: usize) -> &[Self::Pixel];
}
