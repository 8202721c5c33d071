use taskdeck_shared::TaskId;
use tracing::trace;

/// New id order after dropping `dragged`
/// onto `target` within `visible`: the
/// dragged id is removed and reinserted
/// at the index the target held before
/// the removal.
///
/// `None` when nothing would move, or
/// when either id is not part of the
/// visible sequence.
pub fn reordered_ids(
  visible: &[TaskId],
  dragged: TaskId,
  target: TaskId
) -> Option<Vec<TaskId>> {
  if dragged == target {
    return None;
  }

  let dragged_index = visible
    .iter()
    .position(|id| *id == dragged)?;
  let target_index = visible
    .iter()
    .position(|id| *id == target)?;

  let mut order = visible.to_vec();
  order.remove(dragged_index);
  order.insert(target_index, dragged);

  trace!(
    dragged,
    target,
    dragged_index,
    target_index,
    ?order,
    "computed reorder"
  );
  Some(order)
}
