/// COCO class id of "person".
pub const PERSON_CLASS_ID: u32 = 0;

/// Axis-aligned box in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn is_person(&self) -> bool {
        self.class_id == PERSON_CLASS_ID
    }
}

/// Keeps only person detections; everything else is dropped.
pub fn persons(detections: Vec<Detection>) -> Vec<Detection> {
    detections.into_iter().filter(Detection::is_person).collect()
}

/// Greedy non-maximum suppression, highest confidence first.
pub fn non_max_suppression(detections: &mut Vec<Detection>, iou_threshold: f32) {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept = 0;
    for index in 0..detections.len() {
        let overlaps = (0..kept).any(|prev| {
            detections[prev].class_id == detections[index].class_id
                && detections[prev].bbox.iou(&detections[index].bbox) > iou_threshold
        });
        if !overlaps {
            detections.swap(kept, index);
            kept += 1;
        }
    }
    detections.truncate(kept);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32, x1: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BBox {
                x1,
                y1: 0.0,
                x2: x1 + 10.0,
                y2: 10.0,
            },
        }
    }

    #[test]
    fn test_persons_drops_other_classes() {
        let kept = persons(vec![det(0, 0.9, 0.0), det(2, 0.8, 20.0), det(0, 0.4, 40.0)]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(Detection::is_person));
    }

    #[test]
    fn test_iou() {
        let a = det(0, 1.0, 0.0).bbox;
        let b = det(0, 1.0, 5.0).bbox;
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&det(0, 1.0, 100.0).bbox), 0.0);
    }

    #[test]
    fn test_nms_keeps_best_of_overlapping() {
        let mut dets = vec![det(0, 0.5, 1.0), det(0, 0.9, 0.0), det(0, 0.7, 50.0)];
        non_max_suppression(&mut dets, 0.45);

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[1].confidence, 0.7);
    }

    #[test]
    fn test_nms_is_per_class() {
        let mut dets = vec![det(0, 0.9, 0.0), det(1, 0.8, 0.0)];
        non_max_suppression(&mut dets, 0.45);
        assert_eq!(dets.len(), 2);
    }
}
