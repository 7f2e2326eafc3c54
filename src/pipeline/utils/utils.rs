use opencv::core::Rect;

/// Index of the largest score. Ties resolve to the first occurrence.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some(b) if scores[b] >= *score => {}
            _ => best = Some(idx),
        }
    }
    best
}

pub fn rect_to_bbox(rect: &Rect) -> [i32; 4] {
    [rect.x, rect.y, rect.width, rect.height]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.4, 0.1, 0.4]), Some(0));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_rect_to_bbox() {
        assert_eq!(rect_to_bbox(&Rect::new(4, 8, 15, 16)), [4, 8, 15, 16]);
    }
}
