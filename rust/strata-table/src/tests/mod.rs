
#[cfg(test)]
mod column_chunk;


#[cfg(test)]
mod row_group;
